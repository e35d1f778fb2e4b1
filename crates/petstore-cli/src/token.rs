//! # Token Subcommand
//!
//! Mints a bearer token in the API's `{role}:{user_id}:{secret}` format.

use clap::Args;
use uuid::Uuid;

/// Arguments for the token subcommand.
#[derive(Args, Debug)]
pub struct TokenArgs {
    /// Role to encode: customer, staff, or admin.
    #[arg(long)]
    pub role: String,

    /// User binding (required for customer tokens).
    #[arg(long)]
    pub user: Option<Uuid>,

    /// The shared secret the API was started with (`AUTH_TOKEN`).
    #[arg(long)]
    pub secret: String,
}

/// Format the token, enforcing the same rules the API applies on parse.
pub fn mint(args: &TokenArgs) -> anyhow::Result<String> {
    let role = args.role.to_lowercase();
    match role.as_str() {
        "customer" => {
            let user = args
                .user
                .ok_or_else(|| anyhow::anyhow!("customer tokens require --user"))?;
            Ok(format!("customer:{user}:{}", args.secret))
        }
        "staff" | "admin" => {
            let user = args.user.map(|u| u.to_string()).unwrap_or_default();
            Ok(format!("{role}:{user}:{}", args.secret))
        }
        other => anyhow::bail!("unknown role: {other}"),
    }
}

/// Print the minted token.
pub fn run(args: &TokenArgs) -> anyhow::Result<()> {
    println!("{}", mint(args)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn customer_token_includes_user() {
        let user = Uuid::new_v4();
        let token = mint(&TokenArgs {
            role: "customer".to_string(),
            user: Some(user),
            secret: "s3cret".to_string(),
        })
        .unwrap();
        assert_eq!(token, format!("customer:{user}:s3cret"));
    }

    #[test]
    fn customer_without_user_fails() {
        let result = mint(&TokenArgs {
            role: "customer".to_string(),
            user: None,
            secret: "s3cret".to_string(),
        });
        assert!(result.is_err());
    }

    #[test]
    fn staff_token_allows_empty_user() {
        let token = mint(&TokenArgs {
            role: "Staff".to_string(),
            user: None,
            secret: "s3cret".to_string(),
        })
        .unwrap();
        assert_eq!(token, "staff::s3cret");
    }

    #[test]
    fn unknown_role_fails() {
        assert!(mint(&TokenArgs {
            role: "superadmin".to_string(),
            user: None,
            secret: "s".to_string(),
        })
        .is_err());
    }
}
