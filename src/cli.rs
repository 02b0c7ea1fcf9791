use crate::form::FormKind;
use clap::{Args, Parser, Subcommand, ValueEnum};

/// formrelay - validate booking and contact requests and relay them by email
#[derive(Debug, Parser)]
#[command(name = "formrelay")]
#[command(
    about = "Validate booking and contact requests and relay them by email",
    long_about = None
)]
#[command(version)]
pub struct Cli {
    /// Command to execute (if not specified, fills the booking form interactively)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Submit a booking request
    #[command(alias = "book")]
    Booking(BookingArgs),

    /// Send a message through the contact form
    Contact(ContactArgs),

    /// Fill in a form field by field
    #[command(alias = "i")]
    Interactive {
        #[arg(value_enum, default_value = "booking")]
        form: FormArg,
    },

    /// Show the booking calendar and the next bookable days
    Calendar {
        /// Number of upcoming business days to list
        #[arg(long, default_value_t = 7)]
        days: usize,

        /// Pick a date (YYYY-MM-DD) and show how it fills the booking form
        #[arg(long)]
        select: Option<String>,
    },

    /// View configuration
    Config {
        #[command(subcommand)]
        action: ConfigActions,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormArg {
    Booking,
    Contact,
}

impl From<FormArg> for FormKind {
    fn from(arg: FormArg) -> Self {
        match arg {
            FormArg::Booking => FormKind::Booking,
            FormArg::Contact => FormKind::Contact,
        }
    }
}

#[derive(Debug, Args)]
pub struct BookingArgs {
    /// Full name
    #[arg(long)]
    pub name: String,

    /// Email address
    #[arg(long)]
    pub email: String,

    /// Phone number
    #[arg(long)]
    pub phone: String,

    /// Service address
    #[arg(long)]
    pub address: String,

    /// Yard size (small, medium, large, xlarge)
    #[arg(long = "yard-size")]
    pub yard_size: String,

    /// Preferred date (YYYY-MM-DD)
    #[arg(long)]
    pub date: String,

    /// Preferred time (HH:MM)
    #[arg(long)]
    pub time: String,

    /// Anything we should know
    #[arg(long, default_value = "")]
    pub notes: String,
}

impl BookingArgs {
    /// Values keyed by element identifier
    pub fn field_values(&self) -> Vec<(&'static str, &str)> {
        vec![
            ("name", self.name.as_str()),
            ("email", self.email.as_str()),
            ("phone", self.phone.as_str()),
            ("address", self.address.as_str()),
            ("yardSize", self.yard_size.as_str()),
            ("date", self.date.as_str()),
            ("time", self.time.as_str()),
            ("notes", self.notes.as_str()),
        ]
    }
}

#[derive(Debug, Args)]
pub struct ContactArgs {
    /// Your name
    #[arg(long)]
    pub name: String,

    /// Email address
    #[arg(long)]
    pub email: String,

    /// Subject line
    #[arg(long)]
    pub subject: String,

    /// Message body
    #[arg(long)]
    pub message: String,
}

impl ContactArgs {
    /// Values keyed by element identifier
    pub fn field_values(&self) -> Vec<(&'static str, &str)> {
        vec![
            ("contactName", self.name.as_str()),
            ("contactEmail", self.email.as_str()),
            ("contactSubject", self.subject.as_str()),
            ("contactMessage", self.message.as_str()),
        ]
    }
}

#[derive(Debug, Subcommand)]
pub enum ConfigActions {
    /// Display current configuration
    Show,

    /// Print the configuration file location
    Path,
}
