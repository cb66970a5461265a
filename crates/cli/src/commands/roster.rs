//! Roster command - lists mentors or mentees for the signed-in account.

use anyhow::Result;
use mentorlink_core::{ApiClient, Config};

pub async fn execute() -> Result<()> {
    let config = Config::load_with_env()?;
    let api = ApiClient::new(&config)?;

    let me = api.me().await?;
    println!("Roster");
    println!("======");
    println!();
    println!(
        "Account: {} ({})",
        me.name,
        me.account_type.as_deref().unwrap_or("student")
    );
    println!();

    if me.is_university() {
        let requests = api.my_requests().await?;
        if requests.is_empty() {
            println!("No mentee requests yet.");
            println!();
            println!("Students find you through the platform directory and");
            println!("send a request; approve it to unlock messaging.");
        } else {
            for request in &requests {
                let student = match &request.student {
                    Some(profile) => profile,
                    None => continue,
                };
                let status = if request.approved {
                    "\x1b[32m● approved\x1b[0m"
                } else {
                    "\x1b[33m○ pending\x1b[0m "
                };
                let since = request
                    .created_at
                    .map(|dt| dt.format("%Y-%m-%d").to_string())
                    .unwrap_or_else(|| "unknown".to_string());
                println!(
                    "  {} {} - {} (requested {})",
                    status, student.name, student.id, since
                );
            }
            println!();
            println!("Total: {} request(s)", requests.len());
        }
    } else {
        match api.my_mentor().await? {
            Some(link) => {
                let status = if link.approved {
                    "\x1b[32m● approved\x1b[0m"
                } else {
                    "\x1b[33m○ pending\x1b[0m"
                };
                println!("  {} {} - {}", status, link.mentor.name, link.mentor.id);
                if !link.approved {
                    println!();
                    println!("Your request is waiting for approval.");
                    println!("Messaging unlocks once your mentor approves it.");
                }
            }
            None => {
                println!("No mentor assigned.");
                println!();
                println!("Send a request from the web portal, or ask your");
                println!("program admin for an assignment.");
            }
        }
    }

    Ok(())
}
