use std::ffi::{OsStr, OsString};
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use clap::{Args, Parser, Subcommand};
use tracing::{Level, debug};

use ecryptfs_rs::config::{DEFAULT_KEY_BYTES, DEFAULT_SALT, PAGE_SIZE};
use ecryptfs_rs::{CipherFamily, CipherSpec, Credentials, EncryptedFile, FilenameCodec, Salt, check_component, encrypt_file, is_encrypted};

use crate::ui::display;
use crate::ui::progress::Bar;
use crate::ui::prompt;

/// Passphrase and salt shared by every subcommand.
#[derive(Args)]
pub struct Auth {
    /// Mount passphrase; prompted for when omitted.
    #[arg(short, long)]
    passphrase: Option<String>,

    /// Salt as 16 hex characters.
    #[arg(short, long, default_value = DEFAULT_SALT)]
    salt: Salt,
}

impl Auth {
    fn credentials(self) -> Result<Credentials> {
        let passphrase = prompt::passphrase_or_prompt(self.passphrase)?;
        Ok(Credentials::derive(passphrase.expose_secret(), self.salt))
    }
}

#[derive(Args)]
pub struct CipherArgs {
    /// Cipher family: aes, blowfish or des3.
    #[arg(short, long, default_value = "aes")]
    cipher: CipherFamily,

    /// Content key length; defaults to 16 (24 for des3).
    #[arg(short, long, value_name = "BYTES")]
    key_bytes: Option<usize>,
}

impl CipherArgs {
    fn spec(&self) -> Result<CipherSpec> {
        Ok(CipherSpec::new(self.cipher, self.key_bytes.unwrap_or(self.cipher.default_key_bytes()))?)
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the signature of one or more passphrases.
    Makesig {
        /// Passphrase; repeat for several. Prompted for when omitted.
        #[arg(short, long)]
        passphrase: Vec<String>,

        #[arg(short, long, default_value = DEFAULT_SALT)]
        salt: Salt,
    },

    /// Decrypt files to stdout or into a directory.
    Decrypt {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        #[command(flatten)]
        auth: Auth,

        #[command(flatten)]
        cipher: CipherArgs,

        /// Write decrypted files into this directory instead of stdout.
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,

        /// Print credentials and header fields instead of decrypting.
        #[arg(short, long)]
        info: bool,
    },

    /// Encrypt or decrypt filenames, chosen by the marker prefix unless forced.
    Filename {
        #[arg(required = true)]
        names: Vec<PathBuf>,

        #[arg(short, long, conflicts_with = "decrypt")]
        encrypt: bool,

        #[arg(short, long)]
        decrypt: bool,

        /// Rename the files instead of printing the mapping.
        #[arg(short = 'm', long = "move")]
        rename: bool,

        #[command(flatten)]
        auth: Auth,

        #[command(flatten)]
        cipher: CipherArgs,
    },

    /// Print decrypted names of encrypted files.
    Ls {
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// List the contents of each directory.
        #[arg(short, long)]
        directory: bool,

        #[command(flatten)]
        auth: Auth,

        /// Key length for Blowfish-encrypted names.
        #[arg(short, long, value_name = "BYTES", default_value_t = DEFAULT_KEY_BYTES)]
        key_bytes: usize,
    },

    /// Write an encrypted test file named `<cipher>-<bytes>.raw`.
    Genfile {
        dir: PathBuf,

        #[command(flatten)]
        auth: Auth,

        #[command(flatten)]
        cipher: CipherArgs,

        /// Plaintext to encrypt.
        #[arg(long, default_value = "Hello World\n")]
        content: String,
    },
}

#[derive(Parser)]
#[command(name = "ecryptfs-rs", version = "26.1.0", about = "Decrypt eCryptfs files and filenames without mounting.")]
pub struct App {
    /// Log debug output to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// How `filename` treats each name.
#[derive(Clone, Copy, PartialEq, Eq)]
enum NameAction {
    Auto,
    Encrypt,
    Decrypt,
}

impl App {
    pub fn init() -> Result<Self> {
        let app = Self::parse();
        let level = if app.verbose { Level::DEBUG } else { Level::WARN };

        let subscriber = tracing_subscriber::fmt().with_writer(io::stderr).with_max_level(level).with_file(true).with_line_number(true).finish();
        tracing::subscriber::set_global_default(subscriber)?;

        Ok(app)
    }

    pub fn execute(self) -> Result<()> {
        match self.command {
            Commands::Makesig { passphrase, salt } => Self::run_makesig(passphrase, salt),
            Commands::Decrypt { files, auth, cipher, output, info } => Self::run_decrypt(&files, auth, &cipher, output.as_deref(), info),
            Commands::Filename { names, encrypt, decrypt, rename, auth, cipher } => {
                let action = match (encrypt, decrypt) {
                    (true, _) => NameAction::Encrypt,
                    (_, true) => NameAction::Decrypt,
                    _ => NameAction::Auto,
                };
                Self::run_filename(&names, action, rename, auth, &cipher)
            }
            Commands::Ls { paths, directory, auth, key_bytes } => Self::run_ls(&paths, directory, auth, key_bytes),
            Commands::Genfile { dir, auth, cipher, content } => Self::run_genfile(&dir, auth, &cipher, &content),
        }
    }

    fn run_makesig(passphrases: Vec<String>, salt: Salt) -> Result<()> {
        let secrets = if passphrases.is_empty() { vec![prompt::passphrase()?] } else { passphrases.into_iter().map(Into::into).collect() };
        let exposed: Vec<&[u8]> = secrets.iter().map(|s| s.expose_secret()).collect();

        for credentials in Credentials::derive_batch(&exposed, salt) {
            println!("{}", credentials.signature());
        }

        Ok(())
    }

    fn run_decrypt(files: &[PathBuf], auth: Auth, cipher: &CipherArgs, output: Option<&Path>, info: bool) -> Result<()> {
        let spec = cipher.spec()?;
        let credentials = auth.credentials()?;

        if info {
            display::show_credentials(&credentials);
        }
        if let Some(dir) = output {
            fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
        }

        for path in files {
            let input = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
            let mut file = EncryptedFile::open(BufReader::new(input), &credentials, spec).with_context(|| format!("failed to read header of {}", path.display()))?;

            if info {
                display::show_header(path, &file);
                continue;
            }

            match output {
                Some(dir) => Self::decrypt_into(dir, path, &mut file, &credentials)?,
                None => {
                    file.decrypt_to(io::stdout().lock()).with_context(|| format!("failed to decrypt {}", path.display()))?;
                }
            }
        }

        Ok(())
    }

    fn decrypt_into(dir: &Path, path: &Path, file: &mut EncryptedFile<BufReader<File>>, credentials: &Credentials) -> Result<()> {
        let name = path.file_name().and_then(|n| n.to_str()).ok_or_else(|| anyhow!("{} has no usable file name", path.display()))?;
        let plain_name = if is_encrypted(name) {
            let decoded = FilenameCodec::new(credentials).decrypt(name, file.spec().key_bytes()).with_context(|| format!("failed to decrypt name {name}"))?;
            check_component(&decoded).with_context(|| format!("refusing decrypted name of {name}"))?;
            String::from_utf8(decoded).context("decrypted name is not valid UTF-8")?
        } else {
            name.to_owned()
        };

        let target = dir.join(&plain_name);
        let out = File::create(&target).with_context(|| format!("failed to create {}", target.display()))?;

        let bar = Bar::new(file.size().next_multiple_of(PAGE_SIZE as u64), &plain_name)?;
        let progress = |n: u64| bar.add(n);
        let written = file.decrypt_parallel(BufWriter::new(out), Some(&progress)).with_context(|| format!("failed to decrypt {}", path.display()))?;
        bar.finish();

        debug!(source = %path.display(), target = %target.display(), written, "decrypted file");
        display::show_success(&format!("{} -> {} ({})", path.display(), target.display(), display::format_bytes(written)));
        Ok(())
    }

    fn run_filename(names: &[PathBuf], action: NameAction, rename: bool, auth: Auth, cipher: &CipherArgs) -> Result<()> {
        let spec = cipher.spec()?;
        let credentials = auth.credentials()?;
        let codec = FilenameCodec::new(&credentials);

        for path in names {
            let base = path.parent().unwrap_or_else(|| Path::new(""));
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                display::show_skipped(&path.display().to_string(), "not a UTF-8 file name");
                continue;
            };

            let encrypted = is_encrypted(name);
            let new_name = match action {
                NameAction::Encrypt if encrypted => continue,
                NameAction::Decrypt if !encrypted => continue,
                NameAction::Auto | NameAction::Decrypt if encrypted => {
                    let decoded = codec.decrypt(name, spec.key_bytes()).with_context(|| format!("failed to decrypt {name}"))?;
                    check_component(&decoded).with_context(|| format!("refusing decrypted name of {name}"))?;
                    String::from_utf8(decoded).with_context(|| format!("decrypted {name} is not valid UTF-8"))?
                }
                _ => codec.encrypt(name.as_bytes(), spec).with_context(|| format!("failed to encrypt {name}"))?,
            };

            let (from, to) = (base.join(name), base.join(&new_name));
            if rename {
                fs::rename(&from, &to).with_context(|| format!("failed to rename {} to {}", from.display(), to.display()))?;
                debug!(from = %from.display(), to = %to.display(), "renamed");
            } else {
                display::show_mapping(&from.display().to_string(), &to.display().to_string());
            }
        }

        Ok(())
    }

    fn run_ls(paths: &[PathBuf], directory: bool, auth: Auth, key_bytes: usize) -> Result<()> {
        let credentials = auth.credentials()?;
        let codec = FilenameCodec::new(&credentials);

        for path in paths {
            let names = if directory { Self::list_dir(path)? } else { vec![path.file_name().map_or_else(|| path.as_os_str().to_owned(), OsStr::to_owned)] };

            for name in names {
                let Some(text) = name.to_str() else {
                    let shown = Path::new(&name).display().to_string();
                    display::show_mapping(&shown, &shown);
                    continue;
                };
                match codec.decrypt(text, key_bytes) {
                    Ok(plain) => display::show_mapping(&String::from_utf8_lossy(&plain), text),
                    Err(e) => display::show_skipped(text, &e.to_string()),
                }
            }
        }

        Ok(())
    }

    fn list_dir(dir: &Path) -> Result<Vec<OsString>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(dir).with_context(|| format!("failed to list {}", dir.display()))? {
            let entry = entry.with_context(|| format!("failed to list {}", dir.display()))?;
            names.push(entry.file_name());
        }
        names.sort_unstable();
        Ok(names)
    }

    fn run_genfile(dir: &Path, auth: Auth, cipher: &CipherArgs, content: &str) -> Result<()> {
        let spec = cipher.spec()?;
        let credentials = auth.credentials()?;

        fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;

        let data = encrypt_file(content.as_bytes(), &credentials, spec).context("failed to encrypt content")?;
        let target = dir.join(format!("{}-{}.raw", spec.family(), spec.key_bytes()));
        fs::write(&target, data).with_context(|| format!("failed to write {}", target.display()))?;

        display::show_success(&format!("wrote {}", target.display()));
        Ok(())
    }
}
