//! Human-readable output.
//!
//! Status lines go to stderr; stdout carries decrypted data and name mappings.

use std::io::Read;
use std::path::Path;

use bytesize::ByteSize;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};
use console::style;

use ecryptfs_rs::{Credentials, EncryptedFile};

/// Formats bytes into a human-readable string.
pub fn format_bytes(bytes: u64) -> String {
    ByteSize::b(bytes).to_string()
}

/// Prints the session key in 16-byte rows followed by the signature.
pub fn show_credentials(credentials: &Credentials) {
    for (i, row) in credentials.session_key().expose_secret().chunks(16).enumerate() {
        let label = if i == 0 { "session key:" } else { "" };
        println!("{label:>12} {}", hex::encode(row));
    }
    println!("{:>12} {}", "signature:", credentials.signature());
}

/// Prints the parsed header fields of `path` and its root IV as a table.
pub fn show_header<R: Read>(path: &Path, file: &EncryptedFile<R>) {
    let (header, spec) = (file.header(), file.spec());
    let (marker1, marker2) = header.markers();
    let signature = header.signature().map_or_else(|| style("absent").yellow().to_string(), ToString::to_string);

    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_content_arrangement(ContentArrangement::Dynamic).set_header(vec!["Field", "Value"]);

    table.add_row(vec!["File".to_owned(), path.display().to_string()]);
    table.add_row(vec!["Size".to_owned(), format!("{} ({})", header.declared_size(), format_bytes(header.declared_size()))]);
    table.add_row(vec!["Markers".to_owned(), format!("{marker1:#010x} / {marker2:#010x}")]);
    table.add_row(vec!["Version".to_owned(), header.version().to_string()]);
    table.add_row(vec!["Flags".to_owned(), format!("{:#04x}", header.flags())]);
    table.add_row(vec!["Extents".to_owned(), format!("{} x {}", header.extent_count(), header.extent_size())]);
    table.add_row(vec!["Cipher code".to_owned(), format!("{:#04x} (using {spec})", header.cipher_code())]);
    table.add_row(vec!["Salt".to_owned(), header.salt().to_string()]);
    table.add_row(vec!["Iterations".to_owned(), header.iterations().to_string()]);
    table.add_row(vec!["Signature".to_owned(), signature]);
    table.add_row(vec!["Root IV".to_owned(), hex::encode(file.root_iv())]);

    println!("{table}");
}

/// Prints a `plain -> encoded` mapping.
pub fn show_mapping(plain: &str, encoded: &str) {
    println!("{plain} -> {encoded}");
}

pub fn show_success(message: &str) {
    eprintln!("{} {}", style("✓").green(), style(message).bold());
}

pub fn show_skipped(path: &str, reason: &str) {
    eprintln!("{} {} ({reason})", style("-").yellow(), style(path).dim());
}
