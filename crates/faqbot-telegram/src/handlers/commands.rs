use std::sync::Arc;

use teloxide::prelude::*;

use faqbot_core::{
    domain::{BroadcastOutcome, ContactId},
    AgentStats,
};

use crate::router::AppState;

fn parse_command(text: &str) -> (String, String) {
    // Telegram may send `/cmd@botname arg1 ...`
    let mut parts = text.trim().splitn(2, char::is_whitespace);
    let first = parts.next().unwrap_or("").trim();
    let rest = parts.next().unwrap_or("").trim().to_string();

    let cmd = first
        .trim_start_matches('/')
        .split('@')
        .next()
        .unwrap_or("")
        .to_lowercase();

    (cmd, rest)
}

const HELP: &str = "🤖 FAQ bot operator commands\n\n\
/status - Session state\n\
/qr - Pending pairing code\n\
/stats - Contacts, FAQ entries, unrecognized queries\n\
/contacts - List authorized contacts\n\
/authorize <id> - Authorize a contact\n\
/remove <id> - Remove a contact\n\
/broadcast <text> - Send to every contact\n\
/logout - Log the transport out\n\
/restart - Reinitialize the transport";

fn format_stats(st: &AgentStats) -> String {
    let active = if st.active { "yes" } else { "no" };
    format!(
        "📊 Bot Stats\n\n\
State: {}\n\
Active: {active}\n\
Authorized contacts: {}\n\
FAQ entries: {}\n\
Unrecognized queries: {}",
        st.state, st.authorized_contacts, st.faq_entries, st.unrecognized_queries
    )
}

fn format_contacts(contacts: &[ContactId]) -> String {
    if contacts.is_empty() {
        return "No authorized contacts.".to_string();
    }
    let mut out = format!("👥 Authorized contacts ({})\n", contacts.len());
    for c in contacts {
        out.push_str(&format!("\n• {c}"));
    }
    out
}

fn format_outcomes(outcomes: &[BroadcastOutcome], total: usize) -> String {
    if outcomes.is_empty() && total > 0 {
        return "⚠️ Broadcast skipped: session is not connected.".to_string();
    }
    let ok = outcomes.iter().filter(|o| o.succeeded).count();
    let mut out = format!("📣 Broadcast finished: {ok}/{total} delivered");
    if outcomes.len() < total {
        out.push_str(&format!(
            "\nAborted after {} sends (connection closed).",
            outcomes.len()
        ));
    }
    for o in outcomes.iter().filter(|o| !o.succeeded) {
        let err = o.error.as_deref().unwrap_or("unknown error");
        out.push_str(&format!("\n❌ {}: {err}", o.target));
    }
    out
}

async fn reply(bot: &Bot, chat: ChatId, text: impl Into<String>) {
    if let Err(e) = bot.send_message(chat, text.into()).await {
        tracing::warn!(chat = chat.0, "failed to answer operator: {e}");
    }
}

pub async fn handle_command(bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let chat = msg.chat.id;
    let (cmd, arg) = parse_command(text);
    let agent = &state.agent;

    match cmd.as_str() {
        "start" | "help" => {
            reply(&bot, chat, HELP).await;
        }

        "status" => {
            let st = agent.session_state().await;
            let pairing = if agent.pairing_code().await.is_some() {
                "\nA pairing code is pending, see /qr."
            } else {
                ""
            };
            reply(&bot, chat, format!("Session state: {st}{pairing}")).await;
        }

        "qr" => match agent.pairing_code().await {
            Some(code) => reply(&bot, chat, format!("Pairing code:\n{code}")).await,
            None => reply(&bot, chat, "No pairing code pending.").await,
        },

        "stats" => {
            let st = agent.stats().await;
            reply(&bot, chat, format_stats(&st)).await;
        }

        "contacts" => {
            let contacts = agent.list_contacts().await;
            reply(&bot, chat, format_contacts(&contacts)).await;
        }

        "authorize" => {
            if arg.is_empty() {
                reply(&bot, chat, "Usage: /authorize <id>").await;
            } else if agent.authorize_contact(&arg).await {
                reply(&bot, chat, format!("✅ Authorized {arg}")).await;
            } else {
                reply(&bot, chat, format!("❌ Not a valid contact id: {arg}")).await;
            }
        }

        "remove" => {
            if arg.is_empty() {
                reply(&bot, chat, "Usage: /remove <id>").await;
            } else if agent.remove_contact(&arg).await {
                reply(&bot, chat, format!("🗑️ Removed {arg}")).await;
            } else {
                reply(&bot, chat, format!("{arg} is not an authorized contact.")).await;
            }
        }

        "broadcast" => {
            if arg.is_empty() {
                reply(&bot, chat, "Usage: /broadcast <text>").await;
                return Ok(());
            }
            let total = agent.list_contacts().await.len();
            let delay = state.cfg.broadcast_delay.as_secs_f64();
            reply(
                &bot,
                chat,
                format!("📣 Broadcasting to {total} contacts ({delay:.1}s apart)..."),
            )
            .await;

            // Report back when done without holding up this chat's updates.
            let agent = agent.clone();
            tokio::spawn(async move {
                let outcomes = agent.send_broadcast(&arg, None).await;
                reply(&bot, chat, format_outcomes(&outcomes, total)).await;
            });
        }

        "logout" => match agent.logout().await {
            Ok(()) => reply(&bot, chat, "👋 Logged out.").await,
            Err(e) => reply(&bot, chat, format!("❌ Logout failed: {e}")).await,
        },

        "restart" => match agent.restart().await {
            Ok(()) => reply(&bot, chat, "🔄 Transport reinitialized.").await,
            Err(e) => reply(&bot, chat, format!("❌ Restart failed: {e}")).await,
        },

        other => {
            reply(&bot, chat, format!("Unknown command: /{other}\n\n{HELP}")).await;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: &str) -> ContactId {
        ContactId::normalize(raw).unwrap()
    }

    #[test]
    fn parses_command_with_bot_suffix_and_argument() {
        assert_eq!(
            parse_command("/Authorize@faq_bot  +57 300 1"),
            ("authorize".to_string(), "+57 300 1".to_string())
        );
        assert_eq!(parse_command("/stats"), ("stats".to_string(), String::new()));
    }

    #[test]
    fn outcome_summary_lists_failures() {
        let outcomes = vec![
            BroadcastOutcome::success(id("1")),
            BroadcastOutcome::failure(id("2"), "blocked"),
            BroadcastOutcome::success(id("3")),
        ];
        let s = format_outcomes(&outcomes, 3);
        assert!(s.contains("2/3 delivered"));
        assert!(s.contains("❌ 2: blocked"));
        assert!(!s.contains("Aborted"));
    }

    #[test]
    fn outcome_summary_reports_skip_and_abort() {
        assert!(format_outcomes(&[], 2).contains("not connected"));
        let s = format_outcomes(&[BroadcastOutcome::success(id("1"))], 3);
        assert!(s.contains("Aborted after 1 sends"));
    }

    #[test]
    fn contact_list_formatting() {
        assert_eq!(format_contacts(&[]), "No authorized contacts.");
        let s = format_contacts(&[id("11"), id("22")]);
        assert!(s.starts_with("👥 Authorized contacts (2)"));
        assert!(s.ends_with("• 22"));
    }

    #[test]
    fn stats_include_state_label() {
        let s = format_stats(&AgentStats {
            authorized_contacts: 3,
            faq_entries: 8,
            unrecognized_queries: 1,
            active: true,
            state: "connected".to_string(),
        });
        assert!(s.contains("State: connected"));
        assert!(s.contains("Active: yes"));
    }
}
