use anyhow::Result;
use crossterm::{
    execute,
    style::{Color, Print, ResetColor, SetForegroundColor},
};
use std::io::{self, Write};

use certwatch_connector::RefreshOutcome;
use certwatch_notify::{Notification, WatchReport};

/// Color scheme for terminal output.
struct Colors;

impl Colors {
    const UNREAD: Color = Color::Yellow;
    const EXPIRY: Color = Color::DarkYellow;
    const OK: Color = Color::Green;
    const ERROR: Color = Color::Red;
    const DIM: Color = Color::DarkGrey;
    const HEADER: Color = Color::Magenta;
}

/// Renders command output to stdout.
pub struct Terminal;

impl Terminal {
    pub fn new() -> Self {
        Self
    }

    pub fn print_notifications<'a, I>(&self, notifications: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a Notification>,
    {
        let mut stdout = io::stdout();
        let mut shown = 0usize;

        for n in notifications {
            shown += 1;
            let (marker, marker_color) = if n.read {
                ("  ", Colors::DIM)
            } else {
                ("* ", Colors::UNREAD)
            };
            let kind_color = if n.expiry_date.is_some() {
                Colors::EXPIRY
            } else {
                Colors::HEADER
            };

            execute!(
                stdout,
                SetForegroundColor(marker_color),
                Print(marker),
                SetForegroundColor(kind_color),
                Print(format!("[{}] ", n.kind)),
                ResetColor,
                Print(&n.title),
                SetForegroundColor(Colors::DIM),
                Print(format!("  ({})\n", n.id)),
                ResetColor,
                Print(format!("    {}\n", n.message)),
                SetForegroundColor(Colors::DIM),
                Print(format!(
                    "    {} | {} | {}\n",
                    n.created_at.format("%Y-%m-%d %H:%M"),
                    n.path,
                    audience_label(n)
                )),
                ResetColor,
            )?;
        }

        if shown == 0 {
            execute!(
                stdout,
                SetForegroundColor(Colors::DIM),
                Print("No notifications.\n"),
                ResetColor
            )?;
        }
        stdout.flush()?;
        Ok(())
    }

    pub fn print_refresh(&self, outcome: &RefreshOutcome) -> Result<()> {
        match outcome {
            RefreshOutcome::Fresh { customers, report } => {
                self.print_ok(&format!("Fetched {customers} customers."))?;
                self.print_report(report)
            }
            RefreshOutcome::Stale {
                error,
                last_successful_fetch,
            } => {
                let since = last_successful_fetch
                    .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                    .unwrap_or_else(|| "never".to_string());
                self.print_error(&format!(
                    "Refresh failed ({error}); using customers from last successful fetch: {since}"
                ))
            }
        }
    }

    pub fn print_report(&self, report: &WatchReport) -> Result<()> {
        self.print_info(&format!(
            "Scanned {} customers: {} expiring soon, {} new alerts, {} without a usable date.",
            report.scanned, report.in_window, report.emitted, report.skipped
        ))
    }

    pub fn print_ok(&self, msg: &str) -> Result<()> {
        self.print_colored(Colors::OK, msg)
    }

    pub fn print_error(&self, msg: &str) -> Result<()> {
        let mut stderr = io::stderr();
        execute!(
            stderr,
            SetForegroundColor(Colors::ERROR),
            Print(format!("{msg}\n")),
            ResetColor
        )?;
        Ok(())
    }

    pub fn print_info(&self, msg: &str) -> Result<()> {
        self.print_colored(Colors::DIM, msg)
    }

    fn print_colored(&self, color: Color, msg: &str) -> Result<()> {
        let mut stdout = io::stdout();
        execute!(stdout, SetForegroundColor(color), Print(format!("{msg}\n")), ResetColor)?;
        stdout.flush()?;
        Ok(())
    }
}

/// Short description of who a notification targets.
fn audience_label(n: &Notification) -> String {
    if let Some(ref user) = n.for_user {
        format!("user: {user}")
    } else if let Some(ref users) = n.for_users {
        format!("users: {}", users.join(", "))
    } else if let Some(ref roles) = n.for_roles {
        format!("roles: {}", roles.join(", "))
    } else {
        "everyone".to_string()
    }
}
