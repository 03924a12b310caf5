//! The interaction loop.
//!
//! One cycle: list items, compute the layout, draw the grid, read a line,
//! then either re-prompt, page, quit or run the chosen item. While an item
//! runs the dashboard is the only consumer of its output channel and owns
//! the [`OutputBuffer`] outright.

use std::io::Write;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};
use tokio::sync::mpsc::Receiver;
use tokio::sync::mpsc::error::TryRecvError;
use tokio_util::sync::CancellationToken;
use toolgrid_core::config::UiConfig;
use toolgrid_core::exec::{ExecutionBridge, ExecutionResult, OutputLine, StreamEvent};
use toolgrid_core::interrupt::{self, Signal};
use toolgrid_core::items::{Item, ItemSource};

use crate::frame::{self, Content, FrameRenderer};
use crate::input::{Choice, parse_choice};
use crate::layout::{GridLayout, LayoutConstraints, LayoutState};
use crate::output::OutputBuffer;
use crate::terminal;

#[derive(Debug, Clone)]
pub struct DashboardOptions {
    pub title: String,
    pub constraints: LayoutConstraints,
    /// Longest wait on the output channel before checking for signals.
    pub poll_interval: Duration,
    /// How long an inline notice stays before the prompt returns.
    pub notice: Duration,
}

impl From<&UiConfig> for DashboardOptions {
    fn from(ui: &UiConfig) -> Self {
        Self {
            title: ui.title.clone(),
            constraints: LayoutConstraints::from(ui),
            poll_interval: ui.poll_interval(),
            notice: ui.notice_duration(),
        }
    }
}

/// Why [`Dashboard::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    /// `0` at the prompt, or `q` in the empty state.
    Quit,
    /// End of input.
    InputClosed,
    /// Ctrl+C while waiting at a prompt.
    Interrupted,
    /// SIGTERM / SIGHUP.
    Terminated,
}

/// One finished execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRecord {
    pub name: String,
    pub result: ExecutionResult,
}

enum Prompted {
    Line(String),
    Closed,
    Signal(Signal),
}

impl Prompted {
    /// The exit a non-line answer maps to.
    fn exit(&self) -> Option<Exit> {
        match self {
            Prompted::Line(_) => None,
            Prompted::Closed => Some(Exit::InputClosed),
            Prompted::Signal(Signal::Interrupt) => Some(Exit::Interrupted),
            Prompted::Signal(Signal::Terminate) => Some(Exit::Terminated),
        }
    }
}

type SizeProbe = Box<dyn Fn() -> (u16, u16)>;

/// Drives the frame over line input `R` and terminal output `W`.
pub struct Dashboard<R, W> {
    source: Box<dyn ItemSource>,
    bridge: ExecutionBridge,
    renderer: FrameRenderer,
    options: DashboardOptions,
    input: Lines<R>,
    out: W,
    size: SizeProbe,
    page: usize,
    last_layout: Option<LayoutState>,
    pending_error: Option<String>,
    history: Vec<RunRecord>,
}

impl<R, W> Dashboard<R, W>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    pub fn new(
        source: Box<dyn ItemSource>,
        bridge: ExecutionBridge,
        options: DashboardOptions,
        input: R,
        out: W,
    ) -> Self {
        Self {
            source,
            bridge,
            renderer: FrameRenderer::new(options.title.clone()),
            options,
            input: input.lines(),
            out,
            size: Box::new(terminal::terminal_size),
            page: 0,
            last_layout: None,
            pending_error: None,
            history: Vec::new(),
        }
    }

    /// Replaces the terminal size query.
    #[must_use]
    pub fn with_size_probe(mut self, probe: impl Fn() -> (u16, u16) + 'static) -> Self {
        self.size = Box::new(probe);
        self
    }

    /// Executions finished so far, oldest first.
    pub fn history(&self) -> &[RunRecord] {
        &self.history
    }

    /// Runs until the operator quits, input ends or a signal arrives, then
    /// parks the cursor under the frame.
    ///
    /// # Errors
    /// Returns an error if the terminal cannot be written or input cannot
    /// be read.
    pub async fn run(&mut self) -> Result<Exit> {
        let exit = self.run_loop().await;
        if let Some(layout) = &self.last_layout
            && let Err(e) = frame::park_cursor(&mut self.out, layout)
        {
            tracing::warn!("failed to park cursor: {e:#}");
        }
        if let Ok(exit) = &exit {
            tracing::info!(?exit, runs = self.history.len(), "dashboard finished");
        }
        exit
    }

    async fn run_loop(&mut self) -> Result<Exit> {
        loop {
            if interrupt::should_terminate() {
                return Ok(Exit::Terminated);
            }

            let items = match self.source.items() {
                Ok(items) => items,
                Err(e) => {
                    tracing::error!("listing items failed: {e:#}");
                    self.pending_error = Some(format!("{e:#}"));
                    Vec::new()
                }
            };
            let error = self.pending_error.take();

            let (width, height) = (self.size)();
            let layout = GridLayout::compute(width, height, items.len(), &self.options.constraints);
            self.page = self.page.min(layout.page_count() - 1);
            self.last_layout = Some(layout.clone());

            if items.is_empty() {
                if let Some(exit) = self.offer_refresh(&layout, error).await? {
                    return Ok(exit);
                }
                continue;
            }

            let prompt = selection_prompt(&layout);
            self.renderer
                .draw_frame(
                    &mut self.out,
                    &layout,
                    &Content::Grid {
                        items: &items,
                        page: self.page,
                    },
                    &prompt,
                )
                .context("Failed to draw frame")?;
            if let Some(error) = error {
                let notice = self.renderer.theme().error(&error);
                self.notice(&layout, &notice, &prompt).await?;
            }

            let answer = self.read_line().await?;
            if let Some(exit) = answer.exit() {
                return Ok(exit);
            }
            let Prompted::Line(line) = answer else {
                continue;
            };

            match parse_choice(&line, items.len()) {
                Ok(Choice::Quit) => return Ok(Exit::Quit),
                Ok(Choice::NextPage) => {
                    self.page = (self.page + 1).min(layout.page_count() - 1);
                }
                Ok(Choice::PrevPage) => self.page = self.page.saturating_sub(1),
                Ok(Choice::Run(index)) => {
                    if let Some(item) = items.get(index - 1)
                        && let Some(exit) = self.execute(&layout, item).await?
                    {
                        return Ok(exit);
                    }
                }
                Err(e) => {
                    tracing::debug!(input = %line, "rejected selection: {e}");
                    let notice = self.renderer.theme().alert(&e.to_string());
                    self.notice(&layout, &notice, &prompt).await?;
                }
            }
        }
    }

    /// Empty or failed listing: show why, then refresh on Enter or quit on `q`.
    async fn offer_refresh(
        &mut self,
        layout: &LayoutState,
        error: Option<String>,
    ) -> Result<Option<Exit>> {
        let theme = self.renderer.theme();
        let lines = match error {
            Some(error) => vec![
                theme.error("Could not load items."),
                error,
            ],
            None => vec![
                theme.alert("No items found."),
                format!("Looked in {}", self.source.describe()),
            ],
        };
        self.renderer
            .draw_frame(
                &mut self.out,
                layout,
                &Content::Message { lines: &lines },
                "Press Enter to refresh, or 'q' to quit: ",
            )
            .context("Failed to draw frame")?;

        let answer = self.read_line().await?;
        if let Some(exit) = answer.exit() {
            return Ok(Some(exit));
        }
        if let Prompted::Line(line) = answer
            && line.trim().eq_ignore_ascii_case("q")
        {
            return Ok(Some(Exit::Quit));
        }

        self.renderer
            .draw_prompt(&mut self.out, layout, "Refreshing...")
            .context("Failed to draw prompt")?;
        tracing::info!(source = %self.source.describe(), "refreshing items");
        if let Err(e) = self.source.refresh() {
            tracing::warn!("refresh failed: {e:#}");
            self.pending_error = Some(format!("{e:#}"));
        }
        Ok(None)
    }

    /// Streams `item` into the content region until its sentinel arrives,
    /// then waits for Enter.
    async fn execute(&mut self, layout: &LayoutState, item: &Item) -> Result<Option<Exit>> {
        let running = format!("Now executing: {}...", self.renderer.theme().info(&item.name));
        let mut buffer = OutputBuffer::new(layout.output_rows());
        self.renderer
            .draw_frame(
                &mut self.out,
                layout,
                &Content::Output {
                    name: &item.name,
                    buffer: &buffer,
                },
                &running,
            )
            .context("Failed to draw frame")?;

        let cancel = CancellationToken::new();
        let mut rx = self.bridge.start(item, cancel.clone());
        let mut terminating = false;

        let result = loop {
            tokio::select! {
                biased;
                signal = interrupt::wait_for_signal(), if !cancel.is_cancelled() => {
                    tracing::info!(?signal, item = %item.name, "cancelling execution");
                    match signal {
                        Signal::Interrupt => interrupt::reset(),
                        Signal::Terminate => terminating = true,
                    }
                    cancel.cancel();
                }
                polled = tokio::time::timeout(self.options.poll_interval, rx.recv()) => {
                    let Ok(first) = polled else {
                        continue;
                    };
                    let (fresh, finished) = drain(first, &mut rx, &mut buffer);
                    if fresh || finished.is_some() {
                        self.renderer
                            .draw_content(
                                &mut self.out,
                                layout,
                                &Content::Output {
                                    name: &item.name,
                                    buffer: &buffer,
                                },
                                &running,
                            )
                            .context("Failed to draw output")?;
                    }
                    if let Some(result) = finished {
                        break result;
                    }
                }
            }
        };

        self.history.push(RunRecord {
            name: item.name.clone(),
            result,
        });
        if terminating || interrupt::should_terminate() {
            return Ok(Some(Exit::Terminated));
        }

        let theme = self.renderer.theme();
        let done = if result.cancelled {
            theme.info("Execution cancelled. Press Enter...")
        } else if result.succeeded() {
            theme.info("Execution completed. Press Enter...")
        } else {
            theme.alert("Execution failed. Press Enter...")
        };
        self.renderer
            .draw_prompt(&mut self.out, layout, &done)
            .context("Failed to draw prompt")?;
        Ok(self.read_line().await?.exit())
    }

    /// Shows `text` on the prompt row for the notice duration, then restores
    /// `prompt`.
    async fn notice(&mut self, layout: &LayoutState, text: &str, prompt: &str) -> Result<()> {
        self.renderer
            .draw_prompt(&mut self.out, layout, text)
            .context("Failed to draw prompt")?;
        tokio::time::sleep(self.options.notice).await;
        self.renderer
            .draw_prompt(&mut self.out, layout, prompt)
            .context("Failed to draw prompt")?;
        Ok(())
    }

    async fn read_line(&mut self) -> Result<Prompted> {
        tokio::select! {
            line = self.input.next_line() => {
                let line = line.context("Failed to read input")?;
                Ok(line.map_or(Prompted::Closed, Prompted::Line))
            }
            signal = interrupt::wait_for_signal() => {
                if signal == Signal::Interrupt {
                    interrupt::reset();
                }
                Ok(Prompted::Signal(signal))
            }
        }
    }
}

fn selection_prompt(layout: &LayoutState) -> String {
    let paging = if layout.page_count() > 1 {
        ", n/p page"
    } else {
        ""
    };
    format!("Choice (1-{}), 0 quit{paging}: ", layout.item_count)
}

/// Moves `first` and everything already queued behind it into `buffer`.
///
/// Returns whether any line was added and, if the sentinel was reached, the
/// execution result. The buffer is sealed on the sentinel.
fn drain(
    first: Option<StreamEvent>,
    rx: &mut Receiver<StreamEvent>,
    buffer: &mut OutputBuffer,
) -> (bool, Option<ExecutionResult>) {
    let mut fresh = false;
    let mut next = first;
    loop {
        match next {
            Some(StreamEvent::Line(line)) => fresh |= buffer.push(line),
            Some(StreamEvent::Finished(result)) => {
                buffer.seal();
                return (fresh, Some(result));
            }
            None => {
                tracing::error!("output channel closed without a completion event");
                buffer.push(OutputLine::error("Output stream closed unexpectedly"));
                buffer.seal();
                return (true, Some(ExecutionResult::default()));
            }
        }
        next = match rx.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) => return (fresh, None),
            Err(TryRecvError::Disconnected) => None,
        };
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tempfile::TempDir;
    use tokio::sync::mpsc;
    use toolgrid_core::config::RunnerConfig;
    use toolgrid_core::items::DirectorySource;

    use super::*;
    use crate::frame::screen;

    fn options() -> DashboardOptions {
        DashboardOptions {
            title: "Test Tools".to_string(),
            constraints: LayoutConstraints::default(),
            poll_interval: Duration::from_millis(10),
            notice: Duration::ZERO,
        }
    }

    fn bridge() -> ExecutionBridge {
        ExecutionBridge::new(&RunnerConfig {
            interpreter: "sh".to_string(),
            ..RunnerConfig::default()
        })
    }

    fn script(dir: &Path, name: &str, body: &str) {
        fs::write(dir.join(name), body).unwrap();
    }

    async fn run_with(
        source: Box<dyn ItemSource>,
        input: &'static [u8],
        size: (u16, u16),
    ) -> (Exit, Vec<RunRecord>, String) {
        let mut out = Vec::new();
        let (exit, history) = {
            let mut dashboard = Dashboard::new(source, bridge(), options(), input, &mut out)
                .with_size_probe(move || size);
            let exit = dashboard.run().await.unwrap();
            (exit, dashboard.history().to_vec())
        };
        (exit, history, String::from_utf8_lossy(&out).into_owned())
    }

    #[tokio::test]
    async fn test_select_run_and_quit() {
        let temp = TempDir::new().unwrap();
        script(temp.path(), "backup.sh", "echo backup-ran\n");
        script(temp.path(), "cleanup.sh", "echo cleaning\necho done cleaning\n");
        script(temp.path(), "zdiag.sh", "echo zdiag-ran\n");

        // Blank, non-numeric, pick 2, acknowledge, quit.
        let (exit, history, raw) = run_with(
            Box::new(DirectorySource::new(temp.path())),
            b"\nabc\n2\n\n0\n",
            (80, 24),
        )
        .await;

        assert_eq!(exit, Exit::Quit);
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].name, "cleanup.sh");
        assert_eq!(history[0].result.exit_code, Some(0));

        assert!(raw.contains("Invalid selection! Please enter a number."));
        assert!(raw.contains("Invalid input. Please enter a number."));
        assert!(raw.contains("Output for:"));
        assert!(raw.contains("cleaning"));
        assert!(raw.contains("Execution completed. Press Enter..."));
        assert!(!raw.contains("backup-ran"));
        assert!(!raw.contains("zdiag-ran"));

        let screen = screen::dump(raw.as_bytes());
        assert!(screen.contains("1. backup.sh"));
        assert!(screen.contains("3. zdiag.sh"));
    }

    #[tokio::test]
    async fn test_out_of_range_reprompts() {
        let temp = TempDir::new().unwrap();
        script(temp.path(), "only.sh", "echo only\n");

        let (exit, history, raw) = run_with(
            Box::new(DirectorySource::new(temp.path())),
            b"7\n0\n",
            (80, 24),
        )
        .await;
        assert_eq!(exit, Exit::Quit);
        assert!(history.is_empty());
        assert!(raw.contains("Invalid selection! Choose 0-1."));
    }

    #[tokio::test]
    async fn test_failing_item_reports_status_and_stderr() {
        let temp = TempDir::new().unwrap();
        script(temp.path(), "fail.sh", "echo partial\necho oops >&2\nexit 3\n");

        let (exit, history, raw) = run_with(
            Box::new(DirectorySource::new(temp.path())),
            b"1\n\n0\n",
            (80, 24),
        )
        .await;
        assert_eq!(exit, Exit::Quit);
        assert_eq!(history[0].result.exit_code, Some(3));
        assert!(history[0].result.saw_stderr);
        assert!(raw.contains("partial"));
        assert!(raw.contains("oops"));
        assert!(raw.contains("Exited with status 3"));
        assert!(raw.contains("Execution failed. Press Enter..."));
    }

    #[tokio::test]
    async fn test_output_tail_fits_small_region() {
        let temp = TempDir::new().unwrap();
        script(temp.path(), "loud.sh", "i=0\nwhile [ $i -lt 30 ]; do echo row-$i; i=$((i+1)); done\n");

        // 40x9 leaves 3 content rows: header + 2 output rows.
        let mut out = Vec::new();
        {
            let mut dashboard = Dashboard::new(
                Box::new(DirectorySource::new(temp.path())),
                bridge(),
                options(),
                &b"1\n"[..],
                &mut out,
            )
            .with_size_probe(|| (40, 9));
            assert_eq!(dashboard.run().await.unwrap(), Exit::InputClosed);
        }
        let rows = screen::replay(&out);
        assert!(rows[&4].contains("row-28"), "{:?}", rows[&4]);
        assert!(rows[&5].contains("row-29"), "{:?}", rows[&5]);
    }

    #[tokio::test]
    async fn test_pagination_moves_between_pages() {
        let temp = TempDir::new().unwrap();
        for i in 1..=12 {
            script(temp.path(), &format!("tool{i:02}.sh"), "true\n");
        }

        let (exit, _, raw) = run_with(
            Box::new(DirectorySource::new(temp.path())),
            b"n\nn\np\n0\n",
            (40, 9),
        )
        .await;
        assert_eq!(exit, Exit::Quit);
        assert!(raw.contains("page 1/2"));
        assert!(raw.contains("page 2/2"));
        assert!(raw.contains("n/p page"));
    }

    #[tokio::test]
    async fn test_empty_state_quit() {
        let temp = TempDir::new().unwrap();
        let (exit, _, raw) = run_with(
            Box::new(DirectorySource::new(temp.path().join("missing"))),
            b"q\n",
            (80, 24),
        )
        .await;
        assert_eq!(exit, Exit::Quit);
        assert!(raw.contains("No items found."));
        assert!(raw.contains("Press Enter to refresh, or 'q' to quit"));
    }

    struct AppearsOnRefresh {
        dir: TempDir,
        refreshes: Arc<AtomicUsize>,
    }

    impl ItemSource for AppearsOnRefresh {
        fn refresh(&mut self) -> Result<()> {
            self.refreshes.fetch_add(1, Ordering::SeqCst);
            script(self.dir.path(), "new.sh", "true\n");
            Ok(())
        }

        fn items(&self) -> Result<Vec<Item>> {
            DirectorySource::new(self.dir.path()).items()
        }

        fn describe(&self) -> String {
            "fake".to_string()
        }
    }

    #[tokio::test]
    async fn test_enter_refreshes_empty_source() {
        let refreshes = Arc::new(AtomicUsize::new(0));
        let source = AppearsOnRefresh {
            dir: TempDir::new().unwrap(),
            refreshes: Arc::clone(&refreshes),
        };

        let (exit, _, raw) = run_with(Box::new(source), b"\n0\n", (80, 24)).await;
        assert_eq!(exit, Exit::Quit);
        assert_eq!(refreshes.load(Ordering::SeqCst), 1);
        assert!(screen::dump(raw.as_bytes()).contains("1. new.sh"));
    }

    struct Broken;

    impl ItemSource for Broken {
        fn items(&self) -> Result<Vec<Item>> {
            anyhow::bail!("permission denied")
        }

        fn describe(&self) -> String {
            "broken".to_string()
        }
    }

    #[tokio::test]
    async fn test_listing_error_is_shown_not_fatal() {
        let (exit, _, raw) = run_with(Box::new(Broken), b"\nq\n", (80, 24)).await;
        assert_eq!(exit, Exit::Quit);
        assert!(raw.contains("Could not load items."));
        assert!(raw.contains("permission denied"));
    }

    #[tokio::test]
    async fn test_input_closed_ends_loop() {
        let temp = TempDir::new().unwrap();
        script(temp.path(), "a.sh", "true\n");
        let (exit, _, _) = run_with(
            Box::new(DirectorySource::new(temp.path())),
            b"",
            (80, 24),
        )
        .await;
        assert_eq!(exit, Exit::InputClosed);
    }

    #[tokio::test]
    async fn test_drain_stops_at_sentinel() {
        let (tx, mut rx) = mpsc::channel(8);
        tx.send(StreamEvent::Line(OutputLine::output("b"))).await.unwrap();
        tx.send(StreamEvent::Finished(ExecutionResult::default()))
            .await
            .unwrap();
        let mut buffer = OutputBuffer::new(4);

        let (fresh, finished) = drain(
            Some(StreamEvent::Line(OutputLine::output("a"))),
            &mut rx,
            &mut buffer,
        );
        assert!(fresh);
        assert!(finished.is_some());
        assert!(buffer.is_sealed());
        assert!(!buffer.push(OutputLine::output("late")));
        let texts: Vec<_> = buffer.lines().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, ["a", "b"]);
    }

    #[tokio::test]
    async fn test_drain_treats_closed_channel_as_finished() {
        let (tx, mut rx) = mpsc::channel::<StreamEvent>(1);
        drop(tx);
        let mut buffer = OutputBuffer::new(4);
        let (_, finished) = drain(None, &mut rx, &mut buffer);
        assert_eq!(finished, Some(ExecutionResult::default()));
        assert!(buffer.is_sealed());
    }
}
