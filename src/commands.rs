use anyhow::Result;
use std::io::{self, Write};

use crate::answer::AnswerService;
use crate::events::Message;
use crate::orchestrator::{AnswerOrchestrator, DropReason, SubmitOutcome};
use crate::store::Transcript;

/// Submit one question and print the assistant's reply
pub async fn ask<A>(
    orchestrator: &mut AnswerOrchestrator,
    service: &A,
    question: &str,
) -> Result<()>
where
    A: AnswerService + ?Sized,
{
    let outcome = orchestrator.submit(service, question).await;
    let mut stdout = io::stdout().lock();

    match outcome {
        SubmitOutcome::Dropped(DropReason::Blank) => {
            writeln!(stdout, "❌ Nothing to ask: the question is empty.")?;
        }
        SubmitOutcome::Dropped(DropReason::Pending) => {
            writeln!(stdout, "⏳ A question is still waiting for an answer.")?;
        }
        SubmitOutcome::Answered(_) | SubmitOutcome::Failed => {
            if let Some(reply) = orchestrator.transcript().last() {
                writeln!(stdout, "{}", reply.content)?;
            }
        }
    }

    Ok(())
}

/// Print the stored conversation
pub fn history(transcript: &Transcript, assistant_name: &str) -> Result<()> {
    let mut stdout = io::stdout().lock();
    write_transcript(&mut stdout, transcript, assistant_name)?;
    Ok(())
}

fn write_transcript(
    out: &mut impl Write,
    transcript: &Transcript,
    assistant_name: &str,
) -> io::Result<()> {
    writeln!(out, "💬 Conversation ({} messages)", transcript.len())?;
    writeln!(out, "{}", "=".repeat(50))?;

    for message in transcript {
        write_message(out, message, assistant_name)?;
    }

    Ok(())
}

fn write_message(out: &mut impl Write, message: &Message, assistant_name: &str) -> io::Result<()> {
    writeln!(out, "{}:", message.sender.display_name(assistant_name))?;
    for line in message.content.lines() {
        writeln!(out, "  {}", line)?;
    }
    writeln!(out)
}
