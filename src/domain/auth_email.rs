//! Content of the transactional emails sent for authentication events.

use askama::Template;
use serde::Deserialize;

pub const BRAND: &str = "Happy Hair Lab";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailAction {
    Signup,
    Recovery,
    MagicLink,
    EmailChange,
    Other,
}

impl EmailAction {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "signup" => EmailAction::Signup,
            "recovery" => EmailAction::Recovery,
            "magiclink" => EmailAction::MagicLink,
            "email_change" => EmailAction::EmailChange,
            _ => EmailAction::Other,
        }
    }

    pub fn subject(&self) -> String {
        match self {
            EmailAction::Signup => format!("Confirmez votre inscription - {BRAND}"),
            EmailAction::Recovery => format!("Réinitialisez votre mot de passe - {BRAND}"),
            EmailAction::MagicLink => format!("Votre lien de connexion - {BRAND}"),
            EmailAction::EmailChange => {
                format!("Confirmez votre nouvelle adresse email - {BRAND}")
            }
            EmailAction::Other => BRAND.to_string(),
        }
    }

    pub fn content(&self) -> EmailContent {
        match self {
            EmailAction::Signup => EmailContent {
                title: "Bienvenue chez Happy Hair Lab !",
                message: "Merci de nous avoir rejoint ! Cliquez sur le bouton ci-dessous pour confirmer votre adresse email et accéder à votre compte.",
                button: "Confirmer mon email",
            },
            EmailAction::Recovery => EmailContent {
                title: "Réinitialisation de mot de passe",
                message: "Vous avez demandé la réinitialisation de votre mot de passe. Cliquez sur le bouton ci-dessous pour créer un nouveau mot de passe.",
                button: "Réinitialiser mon mot de passe",
            },
            EmailAction::MagicLink => EmailContent {
                title: "Connexion à votre compte",
                message: "Cliquez sur le bouton ci-dessous pour vous connecter à votre compte Happy Hair Lab.",
                button: "Me connecter",
            },
            EmailAction::EmailChange => EmailContent {
                title: "Changement d'adresse email",
                message: "Vous avez demandé à changer votre adresse email. Cliquez sur le bouton ci-dessous pour confirmer ce changement.",
                button: "Confirmer le changement",
            },
            EmailAction::Other => EmailContent {
                title: BRAND,
                message: "Cliquez sur le bouton ci-dessous pour continuer.",
                button: "Continuer",
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmailContent {
    pub title: &'static str,
    pub message: &'static str,
    pub button: &'static str,
}

/// Payload posted by the auth provider's send-email hook.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthEmailPayload {
    pub user: HookUser,
    pub email_data: EmailData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HookUser {
    pub email: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailData {
    #[serde(default)]
    pub token: Option<String>,
    pub token_hash: String,
    #[serde(default)]
    pub redirect_to: Option<String>,
    pub email_action_type: String,
    #[serde(default)]
    pub site_url: Option<String>,
}

pub fn action_url(auth_base: &str, data: &EmailData) -> String {
    let auth_base = auth_base.trim_end_matches('/');
    let redirect = data
        .redirect_to
        .as_deref()
        .filter(|r| !r.is_empty())
        .unwrap_or(auth_base);
    format!(
        "{auth_base}/auth/v1/verify?token={}&type={}&redirect_to={redirect}",
        data.token_hash, data.email_action_type
    )
}

/// HTML layout shared by every auth email.
#[derive(Template)]
#[template(path = "email/auth_action.html")]
struct AuthActionEmailHtml<'a> {
    title: &'a str,
    message: &'a str,
    button: &'a str,
    action_url: &'a str,
    recipient: &'a str,
}

pub fn render_html(
    content: &EmailContent,
    action_url: &str,
    recipient: &str,
) -> Result<String, askama::Error> {
    AuthActionEmailHtml {
        title: content.title,
        message: content.message,
        button: content.button,
        action_url,
        recipient,
    }
    .render()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(action: &str, redirect: Option<&str>) -> EmailData {
        EmailData {
            token: None,
            token_hash: "pkce_abc".into(),
            redirect_to: redirect.map(str::to_string),
            email_action_type: action.into(),
            site_url: None,
        }
    }

    #[test]
    fn subjects_per_action() {
        assert_eq!(
            EmailAction::parse("signup").subject(),
            "Confirmez votre inscription - Happy Hair Lab"
        );
        assert_eq!(
            EmailAction::parse("recovery").subject(),
            "Réinitialisez votre mot de passe - Happy Hair Lab"
        );
        assert_eq!(EmailAction::parse("invite").subject(), "Happy Hair Lab");
    }

    #[test]
    fn content_per_action() {
        assert_eq!(EmailAction::MagicLink.content().button, "Me connecter");
        assert_eq!(
            EmailAction::EmailChange.content().title,
            "Changement d'adresse email"
        );
        assert_eq!(EmailAction::Other.content().button, "Continuer");
    }

    #[test]
    fn action_url_falls_back_to_auth_base() {
        let url = action_url("https://auth.example/", &data("signup", None));
        assert_eq!(
            url,
            "https://auth.example/auth/v1/verify?token=pkce_abc&type=signup&redirect_to=https://auth.example"
        );

        let url = action_url(
            "https://auth.example",
            &data("recovery", Some("https://shop.example/reset")),
        );
        assert!(url.ends_with("type=recovery&redirect_to=https://shop.example/reset"));
    }

    #[test]
    fn html_contains_link_and_recipient() {
        let html = render_html(
            &EmailAction::Signup.content(),
            "https://a.example/v?x=1&y=2",
            "camille@example.fr",
        )
        .unwrap();
        assert!(html.contains("Confirmer mon email"));
        assert!(html.contains("https://a.example/v?x=1&amp;y=2"));
        assert!(html.contains("camille@example.fr"));
    }

    #[test]
    fn html_escapes_recipient_markup() {
        let html = render_html(
            &EmailAction::Other.content(),
            "https://a.example/v",
            "<script>x</script>@example.fr",
        )
        .unwrap();
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;x&lt;/script&gt;@example.fr"));
    }

    #[test]
    fn payload_parses_hook_body() {
        let body = r#"{
            "user": { "id": "u1", "email": "camille@example.fr" },
            "email_data": {
                "token": "123456",
                "token_hash": "hash",
                "redirect_to": "",
                "email_action_type": "magiclink",
                "site_url": "https://shop.example"
            }
        }"#;
        let payload: AuthEmailPayload = serde_json::from_str(body).unwrap();
        assert_eq!(payload.user.email, "camille@example.fr");
        assert_eq!(EmailAction::parse(&payload.email_data.email_action_type), EmailAction::MagicLink);
    }
}
