//! Keyboard polling on its own scheduler thread.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use radar_core::{SharedConfig, ShutdownSignal, SleepMode, TaskScheduler};
use tracing::{debug, info, warn};

pub const INPUT_INTERVAL: Duration = Duration::from_millis(12);

/// Range change per key press, in world units
pub const RANGE_STEP: f32 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputAction {
    Quit,
    IncreaseRange,
    DecreaseRange,
    SaveConfig,
}

/// Map a key event to an action.
pub fn action_for(event: &KeyEvent) -> Option<InputAction> {
    if event.kind != KeyEventKind::Press {
        return None;
    }
    match event.code {
        KeyCode::Esc => Some(InputAction::Quit),
        KeyCode::Char('q') | KeyCode::Char('Q') => Some(InputAction::Quit),
        KeyCode::Char('c') if event.modifiers.contains(KeyModifiers::CONTROL) => {
            Some(InputAction::Quit)
        }
        KeyCode::Char('+') | KeyCode::Char('=') => Some(InputAction::IncreaseRange),
        KeyCode::Char('-') | KeyCode::Char('_') => Some(InputAction::DecreaseRange),
        KeyCode::Char('s') | KeyCode::Char('S') => Some(InputAction::SaveConfig),
        _ => None,
    }
}

/// Apply `action` to the shared state
pub fn apply(action: InputAction, config: &SharedConfig, shutdown: &ShutdownSignal) {
    match action {
        InputAction::Quit => {
            debug!("Quit key pressed");
            shutdown.trigger();
        }
        InputAction::IncreaseRange => {
            let range = config.update(|c| c.radar.adjust_range(RANGE_STEP));
            debug!("Radar range {}", range);
        }
        InputAction::DecreaseRange => {
            let range = config.update(|c| c.radar.adjust_range(-RANGE_STEP));
            debug!("Radar range {}", range);
        }
        InputAction::SaveConfig => match config.save() {
            Ok(()) => info!("Configuration saved"),
            Err(e) => warn!("Failed to save configuration: {}", e),
        },
    }
}

/// Start polling the keyboard every [`INPUT_INTERVAL`].
pub fn start(config: SharedConfig, shutdown: Arc<ShutdownSignal>) -> Result<TaskScheduler> {
    let mut scheduler = TaskScheduler::new("InputPoller", INPUT_INTERVAL, SleepMode::Compensated);
    scheduler.start(move || {
        while event::poll(Duration::ZERO)? {
            if let Event::Key(key) = event::read()?
                && let Some(action) = action_for(&key)
            {
                apply(action, &config, &shutdown);
            }
        }
        Ok(())
    })?;
    Ok(scheduler)
}
