//! Format constants for the eCryptfs on-disk layout.
//!
//! Every numeric value here is fixed by the kernel filesystem; changing any
//! of them produces files and names the kernel cannot read back.
//!
//! ## Groups
//!
//! - **Key derivation**: iteration count, session key, salt and signature sizes
//! - **File header**: marker, extent geometry, version and flag bits
//! - **Packets**: tag bytes used inside the header and in encrypted filenames
//! - **Filenames**: marker string and junk prefix parameters
//! - **Tool defaults**: values the command-line front end falls back to

// === Key Derivation ===

/// Number of chained SHA-512 rounds applied to `salt || passphrase`.
pub const HASH_ITERATIONS: usize = 65536;

/// Length of the derived session key (one SHA-512 digest).
pub const SESSION_KEY_SIZE: usize = 64;

/// Length of the raw salt.
pub const SALT_SIZE: usize = 8;

/// Length of the raw signature carried in headers and filename packets.
pub const SIGNATURE_SIZE: usize = 8;

// === File Header ===

/// XOR relation between the two header marker words.
///
/// A file is recognized when `marker1 == marker2 ^ MAGIC_MARKER`.
pub const MAGIC_MARKER: u32 = 0x3c81_b7f5;

/// Size of one header extent.
pub const HEADER_EXTENT_SIZE: i32 = 4096;

/// Number of extents occupied by the header.
pub const HEADER_EXTENT_COUNT: i16 = 2;

/// Total header size preceding the first ciphertext page.
pub const HEADER_SIZE: usize = 8192;

/// Size of one ciphertext page.
pub const PAGE_SIZE: usize = 4096;

/// File format version written by the fixture writer.
pub const FILE_VERSION: u8 = 0x03;

/// Flag bit marking the body as encrypted.
pub const FLAG_ENCRYPTED: u8 = 0x02;

/// Offset of the first packet inside the header.
pub const PACKET_SET_OFFSET: usize = 26;

// === Packets ===

/// Tag 3: symmetric-key encrypted session key (holds salt and wrapped key).
pub const TAG_3_PACKET: u8 = 0x8C;

/// Tag 11: literal data packet carrying the auth-token signature.
pub const TAG_11_PACKET: u8 = 0xED;

/// Tag 70: encrypted filename packet.
pub const TAG_70_PACKET: u8 = 0x46;

/// Tag 3 packet version byte.
pub const TAG_3_VERSION: u8 = 0x04;

/// OpenPGP string-to-key specifier: salted and iterated.
pub const S2K_SALTED_ITERATED: u8 = 0x03;

/// OpenPGP hash algorithm identifier for MD5.
pub const S2K_HASH_MD5: u8 = 0x01;

/// Encoded S2K count byte; decodes to [`HASH_ITERATIONS`].
pub const S2K_COUNT_BYTE: u8 = 0x60;

/// Format byte of the tag 11 literal packet (`b`, binary).
pub const TAG_11_FORMAT: u8 = b'b';

/// Literal filename recorded in the tag 11 packet.
pub const TAG_11_FILENAME: &[u8] = b"_CONSOLE";

/// Largest size representable by the one-byte packet length form.
pub const PACKET_LEN_ONE_BYTE_MAX: usize = 191;

/// Largest size representable by the two-byte packet length form.
pub const PACKET_LEN_TWO_BYTE_MAX: usize = 8383;

/// Fixed part of a tag 70 packet counted by its length field: signature plus cipher code.
pub const TAG_70_MIN_METADATA_SIZE: usize = SIGNATURE_SIZE + 1;

// === Filenames ===

/// Prefix identifying an encrypted directory entry.
pub const FNEK_MARKER: &str = "ECRYPTFS_FNEK_ENCRYPTED.";

/// Minimum number of random bytes placed before the real filename.
pub const MIN_RANDOM_PREPEND_BYTES: usize = 16;

/// Substitute for zero bytes in generated junk.
pub const NON_NULL: u8 = 0x42;

/// Minimum cleartext length of an encrypted filename.
pub const FILENAME_MIN_CLEARTEXT: usize = 32;

/// Alignment of the filename cleartext.
pub const FILENAME_ALIGNMENT: usize = 16;

// === Tool Defaults ===

/// Salt used by `ecryptfs-add-passphrase` when none is configured.
pub const DEFAULT_SALT: &str = "0011223344556677";

/// Default content key length in bytes.
pub const DEFAULT_KEY_BYTES: usize = 16;

/// Default Blowfish key length in bytes.
pub const DEFAULT_BLOWFISH_KEY_BYTES: usize = 16;

/// Triple-DES key length in bytes; the only one accepted.
pub const DES3_KEY_BYTES: usize = 24;

/// Number of pages batched together into one parallel decryption task.
pub const PAGES_PER_TASK: usize = 64;
