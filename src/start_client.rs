//! Startup helpers and the interactive terminal front end.
//!
//! Logs go to stderr so they never interleave with command output.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};

use crate::client::QaClient;
use crate::core::config::ClientConfig;
use crate::core::document::UploadFile;
use crate::core::ids::DocumentId;
use crate::gateway::GatewayError;
use crate::session::wait_for_redirect;
use crate::view::NoticeKind;

const HELP: &str = "\
Commands:
  login              sign in through the browser
  logout             end the session
  docs               list documents
  refresh            refetch documents from the server
  upload <path>      upload a PDF
  select <id>        select a document to chat with
  ask <question>     ask about the selected document (a bare line works too)
  delete <id>        delete a document
  cleanup            remove documents whose file is gone server-side
  notices            show current notices
  dismiss            dismiss all notices
  help               show this help
  quit               exit";

/// A parsed terminal command.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Command {
    /// Start the browser login.
    Login,
    /// End the session.
    Logout,
    /// Print the document list.
    Docs,
    /// Refetch the document list.
    Refresh,
    /// Upload the file at the path.
    Upload(PathBuf),
    /// Select a document.
    Select(DocumentId),
    /// Ask about the selected document.
    Ask(String),
    /// Delete a document after confirmation.
    Delete(DocumentId),
    /// Prune orphaned documents.
    Cleanup,
    /// Print active notices.
    Notices,
    /// Dismiss active notices.
    Dismiss,
    /// Print help.
    Help,
    /// Leave the loop.
    Quit,
    /// Blank line.
    Empty,
}

/// Parse one input line. Unknown words are treated as the start of a question.
///
/// # Errors
/// Returns a usage string when a command is missing its argument.
pub fn parse_command(line: &str) -> Result<Command, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Command::Empty);
    }

    let (word, rest) = line
        .split_once(char::is_whitespace)
        .map_or((line, ""), |(word, rest)| (word, rest.trim()));

    let require = |usage: &str| {
        if rest.is_empty() {
            Err(format!("usage: {usage}"))
        } else {
            Ok(rest.to_string())
        }
    };

    let command = match word.to_ascii_lowercase().as_str() {
        "login" => Command::Login,
        "logout" => Command::Logout,
        "docs" | "ls" => Command::Docs,
        "refresh" => Command::Refresh,
        "upload" => Command::Upload(PathBuf::from(require("upload <path>")?)),
        "select" => Command::Select(DocumentId::new(require("select <id>")?)),
        "ask" => Command::Ask(require("ask <question>")?),
        "delete" | "rm" => Command::Delete(DocumentId::new(require("delete <id>")?)),
        "cleanup" => Command::Cleanup,
        "notices" => Command::Notices,
        "dismiss" => Command::Dismiss,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        _ => Command::Ask(line.to_string()),
    };
    Ok(command)
}

/// Run the terminal client.
///
/// # Returns
/// `ExitCode::SUCCESS` when the user quits, `1` on startup or I/O failure.
#[must_use]
pub fn run() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("Starting pdfqa client v{}", env!("CARGO_PKG_VERSION"));

    let config = ClientConfig::from_env();
    tracing::info!("API endpoint: {}", config.api_base_url);

    let client = match QaClient::from_config(config) {
        Ok(client) => client,
        Err(e) => {
            tracing::error!("Failed to create client: {e}");
            return ExitCode::from(1);
        }
    };

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to create runtime: {e}");
            return ExitCode::from(1);
        }
    };

    if let Err(e) = rt.block_on(repl(&client)) {
        tracing::error!("Client error: {e:#}");
        return ExitCode::from(1);
    }

    ExitCode::SUCCESS
}

async fn repl(client: &QaClient) -> anyhow::Result<()> {
    client
        .initialize(None)
        .await
        .context("failed to restore session")?;

    let mut input = BufReader::new(tokio::io::stdin()).lines();
    let mut out = std::io::stdout();

    if client.is_authenticated() {
        writeln!(out, "Signed in. {} document(s).", client.documents().len())?;
    } else {
        writeln!(out, "Not signed in. Type `login` to start.")?;
    }

    loop {
        write!(out, "> ")?;
        out.flush()?;
        let Some(line) = input.next_line().await? else {
            break;
        };
        match parse_command(&line) {
            Ok(Command::Quit) => break,
            Ok(command) => execute(client, command, &mut input, &mut out).await?,
            Err(usage) => writeln!(out, "{usage}")?,
        }
    }
    Ok(())
}

/// Execute one command, reading confirmations from `input` and writing to `out`.
///
/// Remote failures are reported on `out`; only local I/O failures are returned.
///
/// # Errors
/// Returns an error if writing output, reading input or persisting the token fails.
pub async fn execute<R, W>(
    client: &QaClient,
    command: Command,
    input: &mut Lines<R>,
    out: &mut W,
) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    match command {
        Command::Login => login(client, out).await?,
        Command::Logout => {
            client.logout();
            writeln!(out, "Signed out.")?;
        }
        Command::Docs => print_documents(client, out)?,
        Command::Refresh => match client.refresh_documents().await {
            Ok(_) => print_documents(client, out)?,
            Err(err) => report(out, &err)?,
        },
        Command::Upload(path) => upload(client, &path, out).await?,
        Command::Select(id) => match client.select_document(&id) {
            Ok(()) => print_transcript(client, out)?,
            Err(err) => report(out, &err)?,
        },
        Command::Ask(question) => {
            if client.selection().is_none() {
                writeln!(out, "Select a document first.")?;
                return Ok(());
            }
            client.set_question(question);
            match client.submit_question().await {
                Ok(Some(answer)) => writeln!(out, "bot: {}", answer.content)?,
                Ok(None) => {}
                Err(err) => report(out, &err)?,
            }
        }
        Command::Delete(id) => {
            let name = client
                .documents()
                .into_iter()
                .find(|doc| doc.id == id)
                .map_or_else(|| id.to_string(), |doc| doc.filename);
            write!(out, "Are you sure you want to delete \"{name}\"? [y/N] ")?;
            out.flush()?;
            let confirmed = input
                .next_line()
                .await?
                .is_some_and(|answer| matches!(answer.trim(), "y" | "Y" | "yes"));
            if !confirmed {
                writeln!(out, "Cancelled.")?;
                return Ok(());
            }
            match client.delete_document(&id).await {
                Ok(_) => print_notices(client, out)?,
                Err(err) => report(out, &err)?,
            }
        }
        Command::Cleanup => match client.cleanup_documents().await {
            Ok(summary) => writeln!(out, "{}", summary.detail)?,
            Err(err) => report(out, &err)?,
        },
        Command::Notices => print_notices(client, out)?,
        Command::Dismiss => {
            for notice in client.notices().active() {
                client.notices().dismiss(notice.id);
            }
        }
        Command::Help => writeln!(out, "{HELP}")?,
        Command::Quit | Command::Empty => {}
    }
    Ok(())
}

async fn login<W: Write>(client: &QaClient, out: &mut W) -> anyhow::Result<()> {
    let url = client.login_url()?;
    writeln!(out, "Open this URL in your browser to sign in:\n  {url}")?;
    out.flush()?;

    let config = client.config();
    let callback = match wait_for_redirect(config.redirect_port, config.login_timeout).await {
        Ok(callback) => callback,
        Err(e) => {
            writeln!(out, "Login failed: {e}")?;
            return Ok(());
        }
    };

    if client.complete_login(&callback).await?.is_some() {
        writeln!(out, "Signed in. {} document(s).", client.documents().len())?;
    } else {
        writeln!(out, "Login redirect carried no token.")?;
    }
    Ok(())
}

async fn upload<W: Write>(client: &QaClient, path: &Path, out: &mut W) -> anyhow::Result<()> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) => {
            writeln!(out, "Cannot read {}: {e}", path.display())?;
            return Ok(());
        }
    };
    let filename = path
        .file_name()
        .map_or_else(|| path.display().to_string(), |name| name.to_string_lossy().into_owned());

    match client
        .upload(vec![UploadFile::from_named_bytes(filename, bytes)])
        .await
    {
        Ok(Some(document)) => {
            print_notices(client, out)?;
            writeln!(out, "  id: {}", document.id)?;
        }
        Ok(None) => {}
        Err(err) => report(out, &err)?,
    }
    Ok(())
}

fn report<W: Write>(out: &mut W, err: &GatewayError) -> std::io::Result<()> {
    match err.user_message() {
        Some(message) => writeln!(out, "error: {message}"),
        None => writeln!(out, "Session ended. Type `login` to sign in again."),
    }
}

fn print_documents<W: Write>(client: &QaClient, out: &mut W) -> std::io::Result<()> {
    if !client.is_authenticated() {
        return writeln!(out, "Not signed in.");
    }
    let entries = client.view().document_entries();
    if entries.is_empty() {
        return writeln!(out, "No documents.");
    }
    for entry in entries {
        let marker = if entry.selected { '*' } else { ' ' };
        let busy = if entry.asking { " (asking)" } else { "" };
        writeln!(
            out,
            "{marker} {:<8} {:<40} {}  [{}]{busy}",
            entry.document.id,
            entry.document.filename,
            entry.document.upload_date.format("%Y-%m-%d %H:%M"),
            entry.message_count,
        )?;
    }
    Ok(())
}

fn print_transcript<W: Write>(client: &QaClient, out: &mut W) -> std::io::Result<()> {
    let snapshot = client.snapshot();
    if let Some(document) = &snapshot.selected {
        writeln!(out, "Chatting with {}", document.filename)?;
    }
    if !snapshot.has_messages {
        return writeln!(out, "No messages yet. Ask a question about this document.");
    }
    for message in &snapshot.transcript {
        let speaker = if message.is_user() { "you" } else { "bot" };
        writeln!(out, "{speaker}: {}", message.content)?;
    }
    Ok(())
}

fn print_notices<W: Write>(client: &QaClient, out: &mut W) -> std::io::Result<()> {
    for notice in client.notices().active() {
        let label = match notice.kind {
            NoticeKind::Error => "error",
            NoticeKind::Success => "ok",
        };
        writeln!(out, "[{label}] {}", notice.text)?;
    }
    Ok(())
}
