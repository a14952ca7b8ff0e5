use std::io::{self, Stdout, Write};
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::{
    event::{self, DisableBracketedPaste, EnableBracketedPaste},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::answer::{AnswerClient, AnswerService};
use crate::events::{AppEvent, TuiEvent};
use crate::orchestrator::{AnswerOrchestrator, PendingAnswer};
use crate::session::Session;
use crate::ui::conversation::{ConversationAction, ConversationManager};

type ChatTerminal = Terminal<CrosstermBackend<Stdout>>;

/// Redraw cadence, keeps the thinking animation moving
const TICK: Duration = Duration::from_millis(150);

/// How long the input reader blocks before yielding
const INPUT_POLL: Duration = Duration::from_millis(10);

/// Run the full-screen chat until the user quits
pub async fn run(session: Session) -> Result<()> {
    let mut terminal = setup_terminal()?;
    let result = event_loop(&mut terminal, session).await;
    restore_terminal(&mut terminal)?;
    result
}

fn setup_terminal() -> Result<ChatTerminal> {
    enable_raw_mode().context("Failed to enable raw mode")?;

    let mut stdout = io::stdout();
    if let Err(err) = execute!(stdout, EnterAlternateScreen, EnableBracketedPaste) {
        abandon_setup(&mut stdout);
        return Err(anyhow::Error::new(err).context("Failed to enter alternate screen"));
    }

    Terminal::new(CrosstermBackend::new(stdout)).map_err(|err| {
        abandon_setup(&mut io::stdout());
        anyhow::Error::new(err).context("Failed to create terminal")
    })
}

/// Undo a partial setup so the shell is usable after an early error
fn abandon_setup(out: &mut impl Write) {
    let _ = execute!(out, LeaveAlternateScreen, DisableBracketedPaste);
    let _ = disable_raw_mode();
}

fn restore_terminal(terminal: &mut ChatTerminal) -> Result<()> {
    disable_raw_mode().context("Failed to disable raw mode")?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableBracketedPaste
    )
    .context("Failed to leave alternate screen")?;
    terminal.show_cursor()?;
    Ok(())
}

async fn event_loop(terminal: &mut ChatTerminal, session: Session) -> Result<()> {
    let Session {
        config,
        mut orchestrator,
        client,
    } = session;

    let mut manager = ConversationManager::new(&config);
    let (tx, mut rx) = mpsc::unbounded_channel::<AppEvent>();
    let input_reader = spawn_input_reader(tx.clone());
    let mut tick = tokio::time::interval(TICK);

    let result = loop {
        let state = orchestrator.snapshot();
        if let Err(err) = terminal.draw(|frame| {
            let area = frame.size();
            manager.render(&state, area, frame.buffer_mut());
        }) {
            break Err(err).context("Failed to draw frame");
        }

        let event = tokio::select! {
            maybe_event = rx.recv() => match maybe_event {
                Some(event) => event,
                None => break Ok(()),
            },
            _ = tick.tick() => continue,
        };

        if !handle_event(event, &mut manager, &mut orchestrator, &client, &tx) {
            break Ok(());
        }
    };

    input_reader.abort();

    if orchestrator.is_pending() {
        info!("exiting with a question still unanswered");
    }
    result
}

/// Forward terminal input into the app channel until the receiver goes away
fn spawn_input_reader(tx: mpsc::UnboundedSender<AppEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            if let Ok(true) = event::poll(INPUT_POLL) {
                match event::read() {
                    Ok(raw) => {
                        let Some(event) = TuiEvent::from_crossterm(raw) else {
                            continue;
                        };
                        if tx.send(AppEvent::Tui(event)).is_err() {
                            break;
                        }
                    }
                    Err(err) => warn!(error = %err, "failed to read terminal event"),
                }
            } else {
                tokio::task::yield_now().await;
            }
        }
    })
}

/// Apply one event; returns `false` when the loop should stop
fn handle_event(
    event: AppEvent,
    manager: &mut ConversationManager,
    orchestrator: &mut AnswerOrchestrator,
    client: &AnswerClient,
    tx: &mpsc::UnboundedSender<AppEvent>,
) -> bool {
    match event {
        AppEvent::AnswerSettled { ticket, outcome } => {
            orchestrator.settle(ticket, outcome);
        }
        AppEvent::Tui(TuiEvent::Key(key)) => match manager.handle_key(key, orchestrator) {
            ConversationAction::Dispatch(ticket) => dispatch(client.clone(), ticket, tx.clone()),
            ConversationAction::Exit => return false,
            ConversationAction::None => {}
        },
        AppEvent::Tui(TuiEvent::Paste(text)) => manager.handle_paste(&text, orchestrator),
        AppEvent::Tui(TuiEvent::Resize(width, height)) => {
            debug!(width, height, "terminal resized");
        }
        AppEvent::Tui(TuiEvent::Draw) => {}
    }
    true
}

/// Send the question off the UI task; the result comes back as an event
fn dispatch<A>(service: A, ticket: PendingAnswer, tx: mpsc::UnboundedSender<AppEvent>)
where
    A: AnswerService + 'static,
{
    tokio::spawn(async move {
        let outcome = service.ask(ticket.question()).await;
        let _ = tx.send(AppEvent::AnswerSettled { ticket, outcome });
    });
}
