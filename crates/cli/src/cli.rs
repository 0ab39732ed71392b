use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use certwatch_notify::{Audience, NotificationSpec};

/// Certificate expiry alerts and in-app notifications.
#[derive(Parser, Debug)]
#[command(name = "certwatch", version, about = "Certificate expiry alerts and in-app notifications")]
pub struct CliArgs {
    /// Directory holding persisted notifications and the customer cache
    /// (overrides CERTWATCH_DATA_DIR)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Customer API base URL (customers are read from `<url>/customers`)
    /// (overrides CERTWATCH_API_URL)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Path to config file (default: ~/.config/certwatch/config.toml)
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List notifications, newest first
    List {
        /// Only show notifications visible to this username
        #[arg(long)]
        user: Option<String>,
        /// Role of the viewing user
        #[arg(long)]
        role: Option<String>,
        /// Print raw JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Print the unread count for a viewer
    Unread {
        #[arg(long)]
        user: Option<String>,
        #[arg(long)]
        role: Option<String>,
    },
    /// Add a notification
    Add(AddArgs),
    /// Mark one notification as read
    Read { id: String },
    /// Mark every notification as read
    ReadAll,
    /// Delete one notification
    Remove { id: String },
    /// Delete all notifications
    Clear,
    /// Fetch customers once and raise expiry alerts
    Refresh,
    /// Refresh repeatedly until Ctrl+C
    Watch {
        /// Seconds between refreshes
        #[arg(long, default_value_t = 300)]
        interval: u64,
    },
    /// Raise expiry alerts from a local JSON file of customers
    Scan {
        #[arg(long)]
        customers: PathBuf,
    },
    /// Show cache freshness and counts
    Status {
        #[arg(long)]
        user: Option<String>,
        #[arg(long)]
        role: Option<String>,
    },
}

#[derive(Args, Debug)]
pub struct AddArgs {
    #[arg(long)]
    pub title: String,

    #[arg(long)]
    pub message: String,

    /// Notification type tag (default: info)
    #[arg(long = "type")]
    pub kind: Option<String>,

    /// Route opened when the notification is clicked
    #[arg(long)]
    pub path: Option<String>,

    #[arg(long)]
    pub icon: Option<String>,

    #[arg(long)]
    pub color: Option<String>,

    /// Single recipient username
    #[arg(long, conflicts_with_all = ["for_users", "for_roles"])]
    pub for_user: Option<String>,

    /// Comma-separated recipient usernames; one notification each
    #[arg(long, value_delimiter = ',', conflicts_with = "for_roles")]
    pub for_users: Vec<String>,

    /// Comma-separated roles allowed to see the notification
    #[arg(long, value_delimiter = ',')]
    pub for_roles: Vec<String>,
}

impl AddArgs {
    pub fn audience(&self) -> Audience {
        if let Some(ref user) = self.for_user {
            Audience::User(user.clone())
        } else if !self.for_users.is_empty() {
            Audience::Users(self.for_users.clone())
        } else if !self.for_roles.is_empty() {
            Audience::Roles(self.for_roles.clone())
        } else {
            Audience::Public
        }
    }

    pub fn into_spec(self) -> NotificationSpec {
        let audience = self.audience();
        NotificationSpec {
            kind: self.kind.map(Into::into),
            title: self.title,
            message: self.message,
            path: self.path,
            icon: self.icon,
            color: self.color,
            audience,
            ..NotificationSpec::default()
        }
    }
}
