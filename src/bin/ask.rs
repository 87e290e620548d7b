use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use textbook_chat::client::session::AssistantReply;
use textbook_chat::client::{
    ChatSession, Citation, CitationPopupController, HttpChatClient, PopupEvent, PopupState, Rect,
    Segment, SubmitOutcome,
};

/// One terminal row above the marker.
const TERMINAL_POPUP_MARGIN: f32 = 1.0;

#[derive(Parser, Debug)]
#[command(name = "ask")]
#[command(about = "Ask the textbook assistant questions from the terminal")]
struct Cli {
    #[arg(long, env = "TEXTBOOK_CHAT_URL", default_value = "http://127.0.0.1:8080")]
    server: String,
    /// Ask a single question, print the answer and exit.
    question: Option<String>,
}

struct Anchor {
    number: usize,
    citation: Citation,
    rect: Rect,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let session = ChatSession::new(Arc::new(HttpChatClient::new(&cli.server)));

    if let Some(question) = cli.question {
        if let SubmitOutcome::Replied(reply) = session.submit(&question).await {
            render_reply(&reply);
        }
        return Ok(());
    }

    println!("Ask about the textbook. Commands: :open N, :close, :scrim, :new, :quit");
    let mut popup = CitationPopupController::new(TERMINAL_POPUP_MARGIN);
    let mut anchors: Vec<Anchor> = Vec::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let input = line.trim();

        match input.split_whitespace().collect::<Vec<_>>().as_slice() {
            [":quit"] | [":q"] => break,
            [":new"] => {
                popup.handle(PopupEvent::Navigate);
                session.reset();
                anchors.clear();
                println!("(new conversation)");
            }
            [":close"] => {
                popup.handle(PopupEvent::Close);
            }
            [":scrim"] => {
                popup.handle(PopupEvent::ScrimPressed);
            }
            [":open", number] => {
                let Ok(number) = number.parse::<usize>() else {
                    println!("usage: :open N");
                    continue;
                };
                match anchors.iter().find(|anchor| anchor.number == number) {
                    Some(anchor) => {
                        popup.handle(PopupEvent::Activate {
                            citation: anchor.citation.clone(),
                            anchor: anchor.rect,
                        });
                        render_popup(popup.state());
                    }
                    None => println!("[{number}] is not a citation in the last answer"),
                }
            }
            _ => match session.submit(input).await {
                SubmitOutcome::Ignored => {}
                SubmitOutcome::Busy => println!("(still waiting for the previous answer)"),
                SubmitOutcome::Replied(reply) => {
                    popup.handle(PopupEvent::Close);
                    anchors = layout_anchors(&reply.parsed.segments);
                    render_reply(&reply);
                }
            },
        }
    }

    Ok(())
}

/// Terminal cell box of each interactive marker, relative to the answer's first row.
fn layout_anchors(segments: &[Segment]) -> Vec<Anchor> {
    let mut anchors = Vec::new();
    let (mut row, mut col) = (0usize, 0usize);

    for segment in segments {
        if let Segment::Marker {
            raw,
            number,
            citation: Some(citation),
        } = segment
        {
            if !anchors.iter().any(|a: &Anchor| a.number == *number) {
                anchors.push(Anchor {
                    number: *number,
                    citation: citation.clone(),
                    rect: Rect {
                        x: col as f32,
                        y: row as f32,
                        width: raw.chars().count() as f32,
                        height: 1.0,
                    },
                });
            }
        }

        for ch in segment.as_str().chars() {
            if ch == '\n' {
                row += 1;
                col = 0;
            } else {
                col += 1;
            }
        }
    }

    anchors
}

fn render_reply(reply: &AssistantReply) {
    println!();
    for segment in &reply.parsed.segments {
        if segment.is_interactive() {
            print!("\x1b[4m{}\x1b[0m", segment.as_str());
        } else {
            print!("{}", segment.as_str());
        }
    }
    println!();

    if !reply.parsed.citations.is_empty() {
        let cited = reply
            .parsed
            .citations
            .iter()
            .map(|c| format!("p.{}", c.page))
            .collect::<Vec<_>>()
            .join(", ");
        println!("Sources: {cited}");
    }
    println!();
}

fn render_popup(state: &PopupState) {
    if let PopupState::Open { citation, position } = state {
        println!(
            "┌ Page {} · similarity {:.2} · at row {}, col {}",
            citation.page, citation.similarity, position.y, position.x
        );
        for line in citation.content.lines() {
            println!("│ {line}");
        }
        println!("└ (:close or :scrim to dismiss)");
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
