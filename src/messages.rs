// src/messages.rs
use poise::serenity_prelude as serenity;

use crate::managers::deploy_manager::DeployedInstance;
use crate::managers::registration_manager::AccountDetails;

pub const EMAIL_TAKEN: &str = "Email already taken.";
pub const LOOKUP_FAILED: &str = "An error occurred. Please try again later.";
pub const UNEXPECTED_ERROR: &str = "An unexpected error occurred.";
pub const ALREADY_REGISTERING: &str =
    "You already have a registration in progress. Please finish it in your registration channel.";
pub const GUILD_ONLY: &str = "This command can only be used in a server.";

pub const PROMPT_EMAIL: &str = "Please provide your Email:";
pub const PROMPT_USERNAME: &str = "Please provide your Username:";
pub const REGISTRATION_TIMED_OUT: &str =
    "Registration timed out. This channel will be removed shortly.";
pub const CREATE_USER_FAILED: &str =
    "An error occurred while creating the user. Please try again later.";
pub const ACCOUNT_CREATED: &str =
    "Your account has been created! Please check your DMs for login details.";

pub const INSTANCE_CREATED: &str = "Instance created successfully!";
pub const DEPLOY_FAILED: &str =
    "An error occurred while creating the instance. Please try again later.";

pub fn register_usage(prefix: &str) -> String {
    format!("Usage: {}register <email>", prefix)
}

pub fn deploy_usage(prefix: &str) -> String {
    format!(
        "Usage: {}deploy <memory> <cpu> <imageName> <name> [var=value ...]",
        prefix
    )
}

pub fn catalog_saved(label: &str) -> String {
    let mut label = label.to_string();
    if let Some(first) = label.get_mut(0..1) {
        first.make_ascii_uppercase();
    }
    format!("{} have been successfully fetched and saved.", label)
}

pub fn catalog_fetch_failed(label: &str) -> String {
    format!(
        "An error occurred while fetching {}. Please try again later.",
        label
    )
}

/// Account summary sent privately to a newly registered user
pub fn account_details_embed(account: &AccountDetails) -> serenity::CreateEmbed {
    serenity::CreateEmbed::new()
        .title("Account Details")
        .color(0x00AE86)
        .field("Username", &account.username, true)
        .field("Email", &account.email, true)
        .field("Password", &account.password, false)
        .footer(serenity::CreateEmbedFooter::new(
            "Please save this information securely!",
        ))
}

pub fn instance_created_embed(instance: &DeployedInstance) -> serenity::CreateEmbed {
    serenity::CreateEmbed::new()
        .title("Instance Created")
        .description(format!("Access your server [here]({})", instance.link))
        .field("Memory", &instance.memory, true)
        .field("CPU", &instance.cpu, true)
        .field("Image", &instance.image_name, true)
        .field("Name", &instance.name, true)
        .footer(serenity::CreateEmbedFooter::new(
            "Warning: Abusing the server may lead to suspension.",
        ))
        .color(0x00FF00)
}

pub fn help_embed(prefix: &str) -> serenity::CreateEmbed {
    serenity::CreateEmbed::new()
        .title("Bot Commands")
        .description("Available commands:")
        .field(format!("{}ping", prefix), "Check if the bot is running", false)
        .field(
            format!("{}register <email>", prefix),
            "Create a panel account in a private channel",
            false,
        )
        .field(
            format!(
                "{}deploy <memory> <cpu> <imageName> <name> [var=value ...]",
                prefix
            ),
            "Deploy a new instance",
            false,
        )
        .field(
            format!("{}fetchimages", prefix),
            "Refresh the image catalog (Admin)",
            false,
        )
        .field(
            format!("{}fetchnodes", prefix),
            "Refresh the node catalog (Admin)",
            false,
        )
        .color(0x3498db)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_embed_contains_credentials() {
        let account = AccountDetails {
            username: "alice".to_string(),
            email: "a@b.com".to_string(),
            password: "1a2b3c4d".to_string(),
        };

        let embed = serde_json::to_value(account_details_embed(&account)).unwrap();
        assert_eq!(embed["title"], "Account Details");
        assert_eq!(embed["footer"]["text"], "Please save this information securely!");

        let fields = embed["fields"].as_array().unwrap();
        let values: Vec<(&str, &str)> = fields
            .iter()
            .map(|f| (f["name"].as_str().unwrap(), f["value"].as_str().unwrap()))
            .collect();
        assert_eq!(
            values,
            vec![
                ("Username", "alice"),
                ("Email", "a@b.com"),
                ("Password", "1a2b3c4d")
            ]
        );
    }

    #[test]
    fn test_catalog_messages() {
        assert_eq!(
            catalog_saved("images"),
            "Images have been successfully fetched and saved."
        );
        assert_eq!(
            catalog_fetch_failed("nodes"),
            "An error occurred while fetching nodes. Please try again later."
        );
    }

    #[test]
    fn test_usage_uses_prefix() {
        assert_eq!(register_usage("?"), "Usage: ?register <email>");
        assert!(deploy_usage("!").starts_with("Usage: !deploy <memory>"));
    }
}
