//! leadline-cli — operator CLI for the Leadline qualification server
//!
//! Talks to the server's HTTP API. Useful for smoke-testing the chat
//! pipeline from a terminal and for a quick look at the lead inbox.
//!
//! # Subcommands
//! - `chat <message> [--session <id>] [--json]` — run one qualification turn
//! - `leads [-n <limit>] [--json]`              — list recent leads
//! - `status`                                   — show server health

use clap::{Parser, Subcommand};
use serde::Deserialize;

const DEFAULT_SERVER: &str = "http://127.0.0.1:8790";
const DEFAULT_LIMIT: usize = 10;

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Debug, Parser)]
#[command(
    name = "leadline-cli",
    version,
    about = "Leadline lead-qualification server — operator CLI"
)]
struct Cli {
    /// Leadline HTTP server URL (overrides LEADLINE_HTTP_URL env var)
    #[arg(long, env = "LEADLINE_HTTP_URL", default_value = DEFAULT_SERVER)]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Send one chat message through the qualification pipeline
    Chat {
        /// The visitor message to send
        message: String,

        /// Reuse an existing session id (continues that conversation)
        #[arg(long)]
        session: Option<String>,

        /// Print the raw JSON response
        #[arg(long)]
        json: bool,
    },

    /// List the most recent leads
    Leads {
        /// Maximum number of leads to show
        #[arg(short = 'n', long, default_value_t = DEFAULT_LIMIT)]
        limit: usize,

        /// Print the raw JSON response
        #[arg(long)]
        json: bool,
    },

    /// Show Leadline server status
    Status,
}

// ============================================================================
// API Response Types
// ============================================================================

/// The chat outcome from POST /chat (camelCase wire format)
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatOutcome {
    pub response: String,
    pub session_id: String,
    #[serde(default)]
    pub error: bool,
    #[serde(default)]
    pub lead_score: i32,
    #[serde(default)]
    pub lead_status: String,
    #[serde(default)]
    pub project_complexity: String,
    #[serde(default)]
    pub contextual_suggestions: Vec<String>,
}

/// One lead row from GET /leads
#[derive(Debug, Deserialize)]
pub struct LeadRow {
    pub email: String,
    pub phone: Option<String>,
    pub qualification_score: i32,
    pub urgency: String,
    pub status: String,
    pub created_at: String,
}

#[derive(Debug, Deserialize)]
pub struct LeadsResponse {
    pub count: usize,
    pub leads: Vec<LeadRow>,
}

// ============================================================================
// Output formatting
// ============================================================================

/// Human-readable one-turn summary.
pub fn summarize_outcome(outcome: &ChatOutcome) -> String {
    let mut out = String::new();
    out.push_str(&outcome.response);
    out.push_str("\n\n");
    if outcome.error {
        out.push_str("⚠ server answered with the fallback reply (check server logs)\n");
    } else {
        out.push_str(&format!(
            "score: {}  status: {}  complexity: {}\n",
            outcome.lead_score, outcome.lead_status, outcome.project_complexity
        ));
    }
    out.push_str(&format!("session: {}", outcome.session_id));
    out
}

/// Fixed-width lead line: score, status, urgency, email.
pub fn format_lead_line(lead: &LeadRow) -> String {
    format!(
        "{:>4}  {:<10} {:<7} {:<30} {}",
        lead.qualification_score,
        lead.status,
        lead.urgency,
        lead.email,
        lead.phone.as_deref().unwrap_or("-")
    )
}

// ============================================================================
// HTTP Client Calls
// ============================================================================

/// Run one chat turn against POST /chat.
fn do_chat(server: &str, message: &str, session: Option<String>, json_output: bool) -> anyhow::Result<()> {
    let client = reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(60))
        .build()?;

    let url = format!("{}/chat", server);
    let body = serde_json::json!({
        "message": message,
        "sessionId": session,
        "userAgent": format!("leadline-cli/{}", env!("CARGO_PKG_VERSION")),
    });

    let resp = match client.post(&url).json(&body).send() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("leadline-cli: connection failed to {}: {}", url, e);
            std::process::exit(1);
        }
    };

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().unwrap_or_default();
        eprintln!("leadline-cli: server returned {}: {}", status, body);
        std::process::exit(1);
    }

    if json_output {
        let raw: serde_json::Value = resp.json()?;
        println!("{}", serde_json::to_string_pretty(&raw)?);
        return Ok(());
    }

    let outcome: ChatOutcome = match resp.json() {
        Ok(o) => o,
        Err(e) => {
            eprintln!("leadline-cli: failed to parse chat response: {}", e);
            std::process::exit(1);
        }
    };

    println!("{}", summarize_outcome(&outcome));
    Ok(())
}

/// List recent leads via GET /leads.
fn do_leads(server: &str, limit: usize, json_output: bool) -> anyhow::Result<()> {
    let client = reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(10))
        .build()?;

    let url = format!("{}/leads?limit={}", server, limit);
    let resp = match client.get(&url).send() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("leadline-cli: connection failed to {}: {}", url, e);
            std::process::exit(1);
        }
    };

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().unwrap_or_default();
        eprintln!("leadline-cli: server returned {}: {}", status, body);
        std::process::exit(1);
    }

    if json_output {
        let raw: serde_json::Value = resp.json()?;
        println!("{}", serde_json::to_string_pretty(&raw)?);
        return Ok(());
    }

    let leads: LeadsResponse = match resp.json() {
        Ok(l) => l,
        Err(e) => {
            eprintln!("leadline-cli: failed to parse leads response: {}", e);
            std::process::exit(1);
        }
    };

    if leads.leads.is_empty() {
        eprintln!("No leads yet.");
        return Ok(());
    }

    println!("score status     urgency email                          phone");
    for lead in &leads.leads {
        println!("{}", format_lead_line(lead));
    }
    println!("\n{} lead(s)", leads.count);
    Ok(())
}

/// Show the server status by calling GET /health.
fn do_status(server: &str) -> anyhow::Result<()> {
    let client = reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(10))
        .build()?;

    let url = format!("{}/health", server);
    let resp = client.get(&url).send();

    match resp {
        Ok(r) if r.status().is_success() => {
            let body: serde_json::Value = r.json().unwrap_or_default();
            println!("Leadline server: {}", body["status"].as_str().unwrap_or("unknown"));
            println!("Version:         {}", body["version"].as_str().unwrap_or("?"));
            println!("PostgreSQL:      {}", body["postgresql"].as_str().unwrap_or("?"));
            println!("Schema tables:   {}", body["schema_tables"]);
            println!("Socket:          {}", body["socket"].as_str().unwrap_or("?"));
        }
        Ok(r) => {
            let status = r.status();
            eprintln!("leadline-cli: server unhealthy (HTTP {})", status);
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("leadline-cli: cannot reach {} — {}", url, e);
            std::process::exit(1);
        }
    }

    Ok(())
}

// ============================================================================
// Main
// ============================================================================

fn main() {
    let cli = Cli::parse();
    let server = cli.server.trim_end_matches('/').to_string();

    let result = match cli.command {
        Commands::Chat { message, session, json } => do_chat(&server, &message, session, json),
        Commands::Leads { limit, json } => do_leads(&server, limit, json),
        Commands::Status => do_status(&server),
    };

    if let Err(e) = result {
        eprintln!("leadline-cli: {}", e);
        std::process::exit(1);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn mock_outcome() -> ChatOutcome {
        ChatOutcome {
            response: "Parlez-moi de votre projet.".to_string(),
            session_id: "abc-123".to_string(),
            error: false,
            lead_score: 45,
            lead_status: "warm".to_string(),
            project_complexity: "medium".to_string(),
            contextual_suggestions: vec![],
        }
    }

    #[test]
    fn test_summarize_outcome_success() {
        let s = summarize_outcome(&mock_outcome());
        assert!(s.contains("Parlez-moi de votre projet."));
        assert!(s.contains("score: 45"));
        assert!(s.contains("status: warm"));
        assert!(s.contains("session: abc-123"));
    }

    #[test]
    fn test_summarize_outcome_error() {
        let mut o = mock_outcome();
        o.error = true;
        let s = summarize_outcome(&o);
        assert!(s.contains("fallback"), "error summary must flag the fallback: {}", s);
        assert!(!s.contains("score:"), "no score line on the error path");
    }

    #[test]
    fn test_format_lead_line() {
        let lead = LeadRow {
            email: "jean@example.com".to_string(),
            phone: None,
            qualification_score: 90,
            urgency: "high".to_string(),
            status: "qualified".to_string(),
            created_at: "2026-01-01T00:00:00Z".to_string(),
        };
        let line = format_lead_line(&lead);
        assert!(line.contains("jean@example.com"));
        assert!(line.contains("qualified"));
        assert!(line.ends_with('-'), "missing phone renders as a dash");
    }

    #[test]
    fn test_chat_outcome_parses_fallback_body() {
        // The fallback body has no score fields; defaults must kick in.
        let json = r#"{"error": true, "response": "Désolé", "sessionId": "s1", "timestamp": "t"}"#;
        let outcome: ChatOutcome = serde_json::from_str(json).unwrap();
        assert!(outcome.error);
        assert_eq!(outcome.lead_score, 0);
        assert_eq!(outcome.session_id, "s1");
    }
}
