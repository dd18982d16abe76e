//! Visualization hooks

use sim_rl_core::{Result, SimulationState};
use tracing::{debug, info};

/// Receives every post-tick state while rendering is enabled
pub trait Renderer: Send {
    fn render(&mut self, state: &SimulationState) -> Result<()>;

    /// Release display resources; must tolerate repeated calls
    fn close(&mut self) -> Result<()>;
}

/// Writes a one-line top-down summary of each frame to the log
#[derive(Debug, Default)]
pub struct LogRenderer {
    frames: u64,
    open: bool,
}

impl LogRenderer {
    /// Frames rendered since construction
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl Renderer for LogRenderer {
    fn render(&mut self, state: &SimulationState) -> Result<()> {
        if !self.open {
            info!("Opening log renderer");
            self.open = true;
        }
        self.frames += 1;
        let agents: Vec<String> = state
            .agents
            .iter()
            .map(|a| format!("{}@({:.1},{:.1})", a.id, a.position[0], a.position[1]))
            .collect();
        debug!(
            "[frame {}] t={:.2}s {}",
            self.frames,
            state.time,
            agents.join(" ")
        );
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if self.open {
            info!("Closing log renderer after {} frames", self.frames);
            self.open = false;
        }
        Ok(())
    }
}
