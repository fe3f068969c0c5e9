use std::io::{self, BufRead, IsTerminal, Write};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use anyhow::Context;
use crossterm::cursor::MoveTo;
use crossterm::queue;
use crossterm::terminal::{Clear, ClearType};
use wiki_core::{update, AppState, Msg, NavigationState};
use wiki_engine::{
    render_document, Activation, EngineHandle, FileStore, GeminiGenerator, KeyValueStore,
};
use wiki_logging::{wiki_debug, wiki_info, wiki_warn};

use super::effects::EffectRunner;
use super::persistence;
use super::ui::input::{parse_command, Command};
use super::ui::render::{render_frame, Frame, Panel, RenderOptions};
use crate::config::AppConfig;

/// Everything the main loop reacts to.
pub(crate) enum LoopEvent {
    Msg(Msg),
    Input(Command),
    /// Standard input reached end of file.
    InputClosed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

pub fn run_app(
    config: AppConfig,
    api_key: String,
    initial_topic: Option<String>,
) -> anyhow::Result<()> {
    let destination = config.log_destination()?;
    if !wiki_logging::initialize(destination, config.log_level(), &config.log_path()) {
        eprintln!("Warning: Logging could not be initialized; continuing without logs");
    }
    wiki_info!(
        "Starting infinite-wiki with model {} (data dir {:?})",
        config.model,
        config.data_dir
    );

    let generator = GeminiGenerator::new(config.generator_settings(api_key))
        .context("failed to set up the generation client")?;
    let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(config.data_dir.clone()));
    let engine = EngineHandle::new(Arc::new(generator));

    let (event_tx, event_rx) = mpsc::channel::<LoopEvent>();
    let effects = EffectRunner::new(engine, store.clone(), event_tx.clone());
    spawn_input_reader(event_tx.clone());

    // Background tick to coalesce redraws while an article streams in.
    thread::spawn(move || {
        let interval = Duration::from_millis(75);
        while event_tx.send(LoopEvent::Msg(Msg::Tick)).is_ok() {
            thread::sleep(interval);
        }
    });

    let stdout = io::stdout();
    let interactive = stdout.is_terminal();
    let options = RenderOptions {
        styled: interactive,
        history_limit: config.history_display_limit,
    };
    let mut app = App::new(effects, stdout, options, interactive);

    app.dispatch(Msg::HistoryRestored(persistence::load_history(
        store.as_ref(),
    )));
    if let Some(topic) = initial_topic {
        app.dispatch(Msg::NavigateRequested(topic));
    }
    app.needs_render = true;
    app.flush_render()?;

    while let Ok(event) = event_rx.recv() {
        if app.handle(event)? == Flow::Quit {
            break;
        }
    }
    wiki_info!("Leaving infinite-wiki");
    Ok(())
}

fn spawn_input_reader(events: mpsc::Sender<LoopEvent>) {
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(err) => {
                    wiki_warn!("Failed to read input: {}", err);
                    break;
                }
            };
            if events.send(LoopEvent::Input(parse_command(&line))).is_err() {
                return;
            }
        }
        let _ = events.send(LoopEvent::InputClosed);
    });
}

struct App<W: Write> {
    state: AppState,
    effects: EffectRunner,
    out: W,
    options: RenderOptions,
    /// Stdout is a terminal: redraw in place and show a prompt.
    interactive: bool,
    panel: Option<Panel>,
    notice: Option<String>,
    needs_render: bool,
    input_closed: bool,
}

impl<W: Write> App<W> {
    fn new(effects: EffectRunner, out: W, options: RenderOptions, interactive: bool) -> Self {
        Self {
            state: AppState::new(),
            effects,
            out,
            options,
            interactive,
            panel: None,
            notice: None,
            needs_render: false,
            input_closed: false,
        }
    }

    fn handle(&mut self, event: LoopEvent) -> io::Result<Flow> {
        match event {
            LoopEvent::Msg(Msg::Tick) => self.flush_render()?,
            LoopEvent::Msg(msg) => self.dispatch(msg),
            LoopEvent::Input(command) => {
                if self.execute(command) == Flow::Quit {
                    return Ok(Flow::Quit);
                }
                self.needs_render = true;
                self.flush_render()?;
            }
            LoopEvent::InputClosed => {
                wiki_debug!("Input closed");
                self.input_closed = true;
            }
        }

        // Piped input: finish the last request, print it and leave.
        if self.input_closed && !self.busy() {
            self.flush_render()?;
            return Ok(Flow::Quit);
        }
        Ok(Flow::Continue)
    }

    fn dispatch(&mut self, msg: Msg) {
        let state = std::mem::take(&mut self.state);
        let (state, effects) = update(state, msg);
        self.state = state;
        self.effects.enqueue(effects);
        if self.state.consume_dirty() {
            self.needs_render = true;
        }
    }

    fn execute(&mut self, command: Command) -> Flow {
        self.notice = None;
        match command {
            Command::Search(topic) => self.navigate(Msg::NavigateRequested(topic)),
            Command::Follow(number) => self.follow_link(number),
            Command::Random => self.navigate(Msg::RandomRequested),
            Command::Home => self.navigate(Msg::NavigateRequested(String::new())),
            Command::History => self.panel = Some(Panel::History),
            Command::OpenHistory(number) => self.open_history(number),
            Command::Retry => {
                if matches!(self.state.navigation(), NavigationState::Error { .. }) {
                    self.navigate(Msg::RetryRequested);
                } else {
                    self.notice = Some("Nothing to retry.".to_string());
                }
            }
            Command::Resume => {
                if self.state.history().is_empty() {
                    self.notice = Some("No history yet.".to_string());
                } else {
                    self.navigate(Msg::ResumeRequested);
                }
            }
            Command::Sources => self.panel = Some(Panel::Sources),
            Command::Help => self.panel = Some(Panel::Help),
            Command::Refresh => self.panel = None,
            Command::Quit => return Flow::Quit,
            Command::Unknown(text) => {
                self.notice = Some(format!("Unknown command '{text}'. Type :help for the list."));
            }
        }
        Flow::Continue
    }

    fn navigate(&mut self, msg: Msg) {
        self.panel = None;
        self.dispatch(msg);
    }

    fn follow_link(&mut self, number: usize) {
        let Some(article) = self.state.article() else {
            self.notice = Some("No article is open.".to_string());
            return;
        };
        let document = render_document(&article.content);

        let mut requested = None;
        let index = number.checked_sub(1).unwrap_or(usize::MAX);
        let activation = document.activate(index, |topic| {
            requested = Some(Msg::NavigateRequested(topic.to_string()));
        });
        match activation {
            Activation::Navigated(_) => {}
            Activation::OpenExternal(href) => {
                self.notice = Some(format!("External link, open it in your browser: {href}"));
            }
            Activation::Missing => {
                self.notice = Some(format!("No link numbered {number}."));
            }
        }
        if let Some(msg) = requested {
            self.navigate(msg);
        }
    }

    fn open_history(&mut self, number: usize) {
        let topic = number
            .checked_sub(1)
            .filter(|index| *index < self.options.history_limit)
            .and_then(|index| self.state.view().history.into_iter().nth(index))
            .map(|row| row.topic);
        match topic {
            Some(topic) => self.navigate(Msg::NavigateRequested(topic)),
            None => self.notice = Some(format!("No history entry {number}.")),
        }
    }

    fn busy(&self) -> bool {
        self.state
            .active_request()
            .is_some_and(|active| active.in_flight)
    }

    fn flush_render(&mut self) -> io::Result<()> {
        if !self.needs_render {
            return Ok(());
        }
        let view = self.state.view();
        // Without a terminal, only settled pages are printed.
        if !self.interactive && view.streaming {
            return Ok(());
        }
        self.needs_render = false;

        let document = view
            .article
            .as_ref()
            .map(|article| render_document(&article.content));
        let text = render_frame(
            &Frame {
                view: &view,
                document: document.as_ref(),
                panel: self.panel,
                notice: self.notice.as_deref(),
            },
            &self.options,
        );

        if self.interactive {
            queue!(self.out, Clear(ClearType::All), MoveTo(0, 0))?;
        }
        self.out.write_all(text.as_bytes())?;
        if self.interactive {
            self.out.write_all(b"\n> ")?;
        }
        self.out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream::{self, StreamExt};
    use pretty_assertions::assert_eq;
    use wiki_core::{PageView, RequestKind};
    use wiki_engine::{ArticleStream, GenerationError, Generator, MemoryStore, PartialArticle};

    const ARTICLE: &str = "# Eiffel Tower\nA tower in [[Paris]], see [site](https://toureiffel.paris).";

    struct CannedGenerator;

    #[async_trait::async_trait]
    impl Generator for CannedGenerator {
        fn stream_article(&self, topic: &str) -> ArticleStream {
            let content = if topic == "Eiffel Tower" {
                ARTICLE.to_string()
            } else {
                format!("# {topic}")
            };
            stream::iter(vec![Ok(PartialArticle {
                content: Some(content),
                sources: Some(Vec::new()),
            })])
            .boxed()
        }

        async fn suggest_random_topic(&self) -> Result<String, GenerationError> {
            Ok("Tardigrade".to_string())
        }
    }

    struct Harness {
        app: App<Vec<u8>>,
        events: mpsc::Receiver<LoopEvent>,
        store: Arc<MemoryStore>,
    }

    impl Harness {
        fn new() -> Self {
            let store = Arc::new(MemoryStore::new());
            let (event_tx, events) = mpsc::channel();
            let engine = EngineHandle::new(Arc::new(CannedGenerator));
            let effects = EffectRunner::new(engine, store.clone(), event_tx);
            let options = RenderOptions {
                styled: false,
                history_limit: 15,
            };
            Self {
                app: App::new(effects, Vec::new(), options, false),
                events,
                store,
            }
        }

        fn input(&mut self, line: &str) {
            let flow = self
                .app
                .handle(LoopEvent::Input(parse_command(line)))
                .unwrap();
            assert_eq!(flow, Flow::Continue);
        }

        /// Feeds engine events back until no request is running.
        fn settle(&mut self) {
            while self.app.busy() {
                let event = self
                    .events
                    .recv_timeout(Duration::from_secs(5))
                    .expect("engine event");
                self.app.handle(event).unwrap();
            }
            self.app.handle(LoopEvent::Msg(Msg::Tick)).unwrap();
        }

        fn output(&self) -> String {
            String::from_utf8_lossy(&self.app.out).into_owned()
        }
    }

    #[test]
    fn search_streams_article_and_records_history() {
        let mut harness = Harness::new();

        harness.input("Eiffel Tower");
        harness.settle();

        assert_eq!(harness.app.state.view().page, PageView::Viewing);
        assert!(harness.output().contains("Eiffel Tower\n\nA tower in Paris[1]"));
        assert!(harness.output().contains("Paris[1]"));
        let saved = harness.store.load("history").unwrap().unwrap_or_default();
        assert!(saved.contains("\"topic\":\"Eiffel Tower\""));
    }

    #[test]
    fn link_number_navigates_to_wiki_topic() {
        let mut harness = Harness::new();
        harness.input("Eiffel Tower");
        harness.settle();

        harness.input("1");

        assert_eq!(
            harness.app.state.active_request().map(|active| &active.kind),
            Some(&RequestKind::Article {
                topic: "Paris".to_string()
            })
        );
    }

    #[test]
    fn external_and_missing_links_only_show_a_notice() {
        let mut harness = Harness::new();
        harness.input("Eiffel Tower");
        harness.settle();

        harness.input("2");
        assert_eq!(
            harness.app.notice.as_deref(),
            Some("External link, open it in your browser: https://toureiffel.paris")
        );
        assert!(!harness.app.busy());

        harness.input("9");
        assert_eq!(harness.app.notice.as_deref(), Some("No link numbered 9."));
    }

    #[test]
    fn random_then_history_pick() {
        let mut harness = Harness::new();

        harness.input(":random");
        harness.settle();
        harness.input("Eiffel Tower");
        harness.settle();

        let topics: Vec<String> = harness
            .app
            .state
            .history()
            .list(15)
            .into_iter()
            .map(|entry| entry.topic.clone())
            .collect();
        assert_eq!(topics, vec!["Eiffel Tower".to_string(), "Tardigrade".to_string()]);

        harness.input(":h 2");
        assert_eq!(
            harness.app.state.active_request().map(|active| &active.kind),
            Some(&RequestKind::Article {
                topic: "Tardigrade".to_string()
            })
        );
    }

    #[test]
    fn commands_without_context_leave_notices() {
        let mut harness = Harness::new();

        harness.input(":retry");
        assert_eq!(harness.app.notice.as_deref(), Some("Nothing to retry."));
        harness.input(":resume");
        assert_eq!(harness.app.notice.as_deref(), Some("No history yet."));
        harness.input("3");
        assert_eq!(harness.app.notice.as_deref(), Some("No article is open."));
        harness.input(":h 1");
        assert_eq!(harness.app.notice.as_deref(), Some("No history entry 1."));
    }

    #[test]
    fn closed_input_quits_once_idle() {
        let mut harness = Harness::new();
        harness.input("Eiffel Tower");

        assert_eq!(harness.app.handle(LoopEvent::InputClosed).unwrap(), Flow::Continue);
        let mut flow = Flow::Continue;
        while flow == Flow::Continue {
            let event = harness
                .events
                .recv_timeout(Duration::from_secs(5))
                .expect("engine event");
            flow = harness.app.handle(event).unwrap();
        }
        assert!(harness.output().contains("Eiffel Tower\n\nA tower in Paris[1]"));
    }

    #[test]
    fn quit_command_stops_the_loop() {
        let mut harness = Harness::new();
        let flow = harness
            .app
            .handle(LoopEvent::Input(Command::Quit))
            .unwrap();
        assert_eq!(flow, Flow::Quit);
    }
}
