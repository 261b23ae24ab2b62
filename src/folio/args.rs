use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "folio", version)]
#[command(about = "Remembers where you stopped reading, on every device", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum Toggle {
    On,
    Off,
}

impl From<Toggle> for bool {
    fn from(toggle: Toggle) -> bool {
        toggle == Toggle::On
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List documents, most recently read first
    #[command(alias = "ls")]
    List,

    /// Show the stored reading state of a document
    Show { path: PathBuf },

    /// Open a document, reconcile with other devices, and save where you stopped
    #[command(alias = "r")]
    Read {
        path: PathBuf,

        /// Page to stop on (1-based)
        #[arg(short, long, value_parser = clap::value_parser!(u64).range(1..))]
        page: Option<u64>,

        /// Scroll offset as X,Y
        #[arg(long, value_name = "X,Y")]
        offset: Option<String>,

        /// Zoom factor
        #[arg(long)]
        zoom: Option<f64>,

        /// Read in landscape orientation
        #[arg(long)]
        landscape: bool,

        /// Jump to a newer page from another device
        #[arg(long, conflicts_with = "keep_local")]
        accept_remote: bool,

        /// Stay on the local page without asking
        #[arg(long)]
        keep_local: bool,
    },

    /// Change display preferences for a document
    Prefs {
        path: PathBuf,

        /// Reading direction: vertical, ltr or rtl
        #[arg(long)]
        direction: Option<String>,

        /// Two pages side by side
        #[arg(long, value_enum)]
        two_up: Option<Toggle>,

        /// Find-on-page bar
        #[arg(long, value_enum)]
        find: Option<Toggle>,

        /// Treat the document as forbidding page reordering
        #[arg(long)]
        locked: bool,
    },

    /// Forget the reading state of a document
    Forget { path: PathBuf },

    /// Repair records for moved, deleted, or duplicated documents
    Doctor,

    /// Get or set configuration
    Config {
        /// Configuration key (device-name, library-root, mirror-dir, browser-style)
        key: Option<String>,

        /// Value to set (if omitted, prints current value)
        value: Option<String>,
    },
}
