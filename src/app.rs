use crate::api::{ApiClient, Queries};
use crate::avatar::{AvatarRotation, SharedAvatars};
use crate::config::Config;
use crate::event::{Event, EventHandler};
use crate::query::QueryError;
use crate::ui;
use crate::ui::components::{CommandEvent, CommandInput, KeyResult};
use crate::ui::view::{View, ViewAction};
use crate::ui::views::{
  DashboardView, MessagesView, RunningModulesView, StatusSelectorView, ValuePanelView,
};
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::io::{stdout, Stdout};
use std::time::Duration;
use tracing::{debug, error, info};

/// How often views poll their subscriptions
const TICK_RATE: Duration = Duration::from_millis(100);

/// Main application state
pub struct App {
  /// Navigation stack - the dashboard is always at index 0
  view_stack: Vec<Box<dyn View>>,

  /// Command input component (handles : commands)
  command: CommandInput,

  queries: Queries,
  avatars: SharedAvatars,

  /// Header title from config
  title: Option<String>,
  api_url: String,

  /// One-line message in the footer, cleared on the next key
  notice: Option<String>,

  should_quit: bool,
}

impl App {
  /// Must be called inside a tokio runtime: the dashboard starts polling
  /// right away.
  pub fn new(config: &Config) -> Result<Self> {
    let api = ApiClient::new(&config.api)?;
    let api_url = api.base_url().to_string();
    let queries = Queries::new(api, config.polling.clone());
    let avatars = AvatarRotation::shared();
    let dashboard = DashboardView::new(&queries, avatars.clone())?;

    info!(api = %api_url, "dashboard started");

    Ok(Self {
      view_stack: vec![Box::new(dashboard)],
      command: CommandInput::new(),
      queries,
      avatars,
      title: config.title.clone(),
      api_url,
      notice: None,
      should_quit: false,
    })
  }

  pub async fn run(&mut self) -> Result<()> {
    let mut terminal = setup_terminal()?;
    let result = self.event_loop(&mut terminal).await;
    restore_terminal()?;
    result
  }

  async fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    let mut events = EventHandler::new(TICK_RATE);
    let mut dirty = true;

    while !self.should_quit {
      if dirty {
        terminal.draw(|frame| ui::draw(frame, self))?;
        dirty = false;
      }

      match events.next().await {
        Some(Event::Key(key)) => {
          self.handle_key(key);
          dirty = true;
        }
        Some(Event::Resize) => dirty = true,
        Some(Event::Tick) => dirty |= self.tick(),
        None => break,
      }
    }

    Ok(())
  }

  /// Poll every view on the stack and evict idle cache entries.
  fn tick(&mut self) -> bool {
    let changed = self
      .view_stack
      .iter_mut()
      .fold(false, |changed, view| view.tick() | changed);
    self.queries.cache().collect_garbage();
    changed
  }

  fn handle_key(&mut self, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.should_quit = true;
      return;
    }
    self.notice = None;

    match self.command.handle_key(key) {
      KeyResult::Event(CommandEvent::Submitted(cmd)) => {
        self.execute_command(&cmd);
        return;
      }
      KeyResult::Handled | KeyResult::Event(CommandEvent::Cancelled) => return,
      KeyResult::NotHandled => {}
    }

    let action = match self.view_stack.last_mut() {
      Some(view) => view.handle_key(key),
      None => ViewAction::None,
    };
    match action {
      ViewAction::None => {}
      ViewAction::Push(view) => self.view_stack.push(view),
      ViewAction::Pop => {
        if self.view_stack.len() > 1 {
          self.view_stack.pop();
        } else {
          self.should_quit = true;
        }
      }
    }
  }

  fn execute_command(&mut self, cmd: &str) {
    debug!(command = cmd, "executing command");

    let view: Result<Box<dyn View>, QueryError> = match cmd {
      "dashboard" => {
        self.view_stack.truncate(1);
        return;
      }
      "selector" => StatusSelectorView::new(&self.queries, self.avatars.clone())
        .map(|v| Box::new(v) as Box<dyn View>),
      "modules" => RunningModulesView::new(&self.queries).map(|v| Box::new(v) as Box<dyn View>),
      "panel" => Ok(Box::new(ValuePanelView::new(&self.queries))),
      "messages" => MessagesView::new(&self.queries).map(|v| Box::new(v) as Box<dyn View>),
      "quit" => {
        self.should_quit = true;
        return;
      }
      "" => return,
      other => {
        self.notice = Some(format!("Unknown command: {}", other));
        return;
      }
    };

    match view {
      Ok(view) => {
        // Commands always open on top of the dashboard
        self.view_stack.truncate(1);
        self.view_stack.push(view);
      }
      Err(e) => {
        error!(command = cmd, error = %e, "failed to open view");
        self.notice = Some(e.to_string());
      }
    }
  }

  // Accessors for UI rendering
  pub fn current_view(&self) -> Option<&dyn View> {
    self.view_stack.last().map(|v| v.as_ref())
  }

  pub fn current_view_mut(&mut self) -> Option<&mut Box<dyn View>> {
    self.view_stack.last_mut()
  }

  pub fn command(&self) -> &CommandInput {
    &self.command
  }

  pub fn title(&self) -> Option<&str> {
    self.title.as_deref()
  }

  pub fn api_url(&self) -> &str {
    &self.api_url
  }

  pub fn notice(&self) -> Option<&str> {
    self.notice.as_deref()
  }

  pub fn view_breadcrumb(&self) -> Vec<String> {
    self
      .view_stack
      .iter()
      .map(|v| v.breadcrumb_label())
      .collect()
  }
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
  enable_raw_mode()?;
  stdout().execute(EnterAlternateScreen)?;
  Ok(Terminal::new(CrosstermBackend::new(stdout()))?)
}

fn restore_terminal() -> Result<()> {
  disable_raw_mode()?;
  stdout().execute(LeaveAlternateScreen)?;
  Ok(())
}

/// Leave the alternate screen before the panic report is printed.
///
/// Install after `color_eyre::install` so its report handler runs last.
pub fn install_panic_hook() {
  let report = std::panic::take_hook();
  std::panic::set_hook(Box::new(move |info| {
    let _ = restore_terminal();
    report(info);
  }));
}
