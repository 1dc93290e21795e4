//! Scripted interaction states for the headless host, e.g.
//! `listening:2000,thinking:3000,speaking:4000,idle:2000`.

use anyhow::{bail, Context};
use std::time::Duration;

#[derive(Clone, Debug, PartialEq)]
pub struct ScriptStep {
    pub state: String,
    pub hold: Duration,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Script(pub Vec<ScriptStep>);

pub fn parse_script(text: &str) -> anyhow::Result<Script> {
    let mut steps = Vec::new();
    for part in text.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let Some((state, millis)) = part.split_once(':') else {
            bail!("expected `state:millis`, got `{part}`");
        };
        let state = state.trim();
        if state.is_empty() {
            bail!("missing state name in `{part}`");
        }
        let millis: u64 = millis
            .trim()
            .parse()
            .with_context(|| format!("invalid duration in `{part}`"))?;
        steps.push(ScriptStep {
            state: state.to_string(),
            hold: Duration::from_millis(millis),
        });
    }
    Ok(Script(steps))
}

/// Walks a script in real time, reporting each state as it begins.
pub struct ScriptPlayer {
    steps: Vec<ScriptStep>,
    looping: bool,
    index: usize,
    elapsed: Duration,
    finished: bool,
}

impl ScriptPlayer {
    pub fn new(script: Script, looping: bool) -> Self {
        let finished = script.0.is_empty();
        Self {
            steps: script.0,
            looping,
            index: 0,
            elapsed: Duration::ZERO,
            finished,
        }
    }

    pub fn first(&self) -> Option<&str> {
        self.steps.first().map(|s| s.state.as_str())
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Advance by `dt`; returns the next state when the current hold expires.
    /// At most one step is taken per call.
    pub fn advance(&mut self, dt: Duration) -> Option<&str> {
        if self.finished {
            return None;
        }
        self.elapsed += dt;
        let hold = self.steps.get(self.index)?.hold;
        if self.elapsed < hold {
            return None;
        }
        self.elapsed -= hold;
        self.index += 1;
        if self.index == self.steps.len() {
            if !self.looping {
                self.finished = true;
                return None;
            }
            self.index = 0;
        }
        self.steps.get(self.index).map(|s| s.state.as_str())
    }
}
