// Presentation side effects: notifications and the pass celebration
use serde::Serialize;
use std::sync::Mutex;

use crate::session::Effect;

pub const PASS_MESSAGE: &str = "All Test Passed! Great Job.";
pub const TESTS_FAILED_MESSAGE: &str = "Tests failed.";
pub const EXECUTION_FAILED_MESSAGE: &str = "Code execution failed.";

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConfettiBurst {
    pub particle_count: u32,
    pub spread: u32,
    /// Normalized (x, y) launch point, 0.0..=1.0 from the top-left
    pub origin: (f32, f32),
}

/// Parameters of the celebration shown when a run passes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Celebration {
    pub bursts: Vec<ConfettiBurst>,
}

impl Celebration {
    /// Two bursts, one from each side of the screen
    pub fn confetti() -> Self {
        Self {
            bursts: vec![
                ConfettiBurst {
                    particle_count: 80,
                    spread: 250,
                    origin: (0.2, 0.6),
                },
                ConfettiBurst {
                    particle_count: 80,
                    spread: 250,
                    origin: (0.8, 0.6),
                },
            ],
        }
    }
}

/// Fire-and-forget user notifications
pub trait NotificationSink: Send + Sync {
    fn notify_success(&self, message: &str);

    fn notify_failure(&self, message: &str);
}

pub trait CelebrationTrigger: Send + Sync {
    fn celebrate(&self, celebration: &Celebration);
}

/// Routes presentation effects to their sinks
pub struct Presenter<'a> {
    notifications: &'a dyn NotificationSink,
    celebration: &'a dyn CelebrationTrigger,
}

impl<'a> Presenter<'a> {
    pub fn new(
        notifications: &'a dyn NotificationSink,
        celebration: &'a dyn CelebrationTrigger,
    ) -> Self {
        Self {
            notifications,
            celebration,
        }
    }

    /// Present every presentation effect; `Execute` effects are not ours
    pub fn present(&self, effects: &[Effect]) {
        for effect in effects {
            match effect {
                Effect::Celebrate(celebration) => self.celebration.celebrate(celebration),
                Effect::NotifySuccess(message) => self.notifications.notify_success(message),
                Effect::NotifyFailure(message) => self.notifications.notify_failure(message),
                Effect::Execute(_) => {}
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum Notification {
    Success(String),
    Failure(String),
}

/// Records everything presented so callers can hand it back to a client
#[derive(Debug, Default)]
pub struct CollectingSink {
    notifications: Mutex<Vec<Notification>>,
    celebrations: Mutex<Vec<Celebration>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications
            .lock()
            .map(|n| n.clone())
            .unwrap_or_default()
    }

    pub fn celebrations(&self) -> Vec<Celebration> {
        self.celebrations
            .lock()
            .map(|c| c.clone())
            .unwrap_or_default()
    }

    fn push(&self, notification: Notification) {
        if let Ok(mut notifications) = self.notifications.lock() {
            notifications.push(notification);
        }
    }
}

impl NotificationSink for CollectingSink {
    fn notify_success(&self, message: &str) {
        self.push(Notification::Success(message.to_string()));
    }

    fn notify_failure(&self, message: &str) {
        self.push(Notification::Failure(message.to_string()));
    }
}

impl CelebrationTrigger for CollectingSink {
    fn celebrate(&self, celebration: &Celebration) {
        if let Ok(mut celebrations) = self.celebrations.lock() {
            celebrations.push(celebration.clone());
        }
    }
}
