//! Whoami command - print the signed-in reviewer.

use anyhow::{Context, Result};
use evalform_core::{FormService, User};

use crate::client::ApiClient;
use crate::{Config, OutputFormat};

/// Execute the whoami command.
///
/// # Errors
///
/// Returns an error if the current user cannot be fetched.
pub async fn execute(config: &Config) -> Result<()> {
    let client = ApiClient::new(config)?;
    let user = client
        .current_user()
        .await
        .context("Failed to fetch current user")?;

    print_user(&user, &config.format)
}

fn print_user(user: &User, format: &OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(user).context("Failed to serialize user")?
            );
        }
        OutputFormat::Text => {
            for (label, value) in user_fields(user) {
                println!("{label:<6} {value}");
            }
        }
        OutputFormat::Table => {
            use tabled::{Table, Tabled};

            #[derive(Tabled)]
            struct Field {
                #[tabled(rename = "Field")]
                label: &'static str,
                #[tabled(rename = "Value")]
                value: String,
            }

            let rows: Vec<_> = user_fields(user)
                .into_iter()
                .map(|(label, value)| Field { label, value })
                .collect();
            println!("{}", Table::new(rows));
        }
    }
    Ok(())
}

fn user_fields(user: &User) -> Vec<(&'static str, String)> {
    vec![
        ("ID:", user.id.to_string()),
        ("Name:", format!("{} {}", user.first_name, user.last_name)),
        ("Email:", user.email.clone().unwrap_or_else(|| "-".to_string())),
        ("Phone:", user.phone.clone().unwrap_or_else(|| "-".to_string())),
    ]
}
