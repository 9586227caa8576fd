//! Brew timer state machine
//! States: Idle, Countdown, Running, Paused, Complete

use crate::stages::stage_at;
use crate::types::{ExpandedStage, COUNTDOWN_SECONDS};
use log::{debug, info};
use statig::prelude::*;

// Input events to the timer
#[derive(Debug, Clone)]
pub enum TimerInput {
    Start,
    Pause,
    Resume,
    Reset,
    /// One-second tick from the UI loop
    Tick,
}

// Output events collected during a transition
#[derive(Debug, Clone, PartialEq)]
pub enum TimerOutput {
    CountdownStarted { seconds: u32 },
    CountdownTick { remaining: u32 },
    TimingStarted,
    Paused,
    Resumed,
    StageAdvanced { from: usize, to: usize },
    Finished { total_time: u32 },
    Reset,
}

/// External view of the timer state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerPhase {
    Idle,
    Countdown,
    Running,
    Paused,
    Complete,
}

// Shared context for the timer machine
#[derive(Debug, Default)]
pub struct TimerContext {
    pub current_time: u32,
    pub current_stage: usize,
    pub countdown_time: Option<u32>,
    pub show_complete: bool,
    pub expanded: Vec<ExpandedStage>,
    outputs: heapless::Vec<TimerOutput, 8>,
}

impl TimerContext {
    fn emit(&mut self, output: TimerOutput) {
        let _ = self.outputs.push(output);
    }

    fn total_duration(&self) -> u32 {
        self.expanded.last().map(|s| s.end_time).unwrap_or(0)
    }

    fn rewind(&mut self) {
        self.current_time = 0;
        self.current_stage = 0;
        self.countdown_time = None;
        self.show_complete = false;
    }
}

#[derive(Debug, Default)]
pub struct BrewTimerMachine;

#[state_machine(
    initial = "State::idle()",
    state(derive(Debug)),
    on_transition = "Self::on_transition"
)]
impl BrewTimerMachine {
    /// Nothing running; waiting for a start with a non-empty stage sequence.
    #[state]
    fn idle(context: &mut TimerContext, event: &TimerInput) -> Response<State> {
        use Response::*;

        match event {
            TimerInput::Start => {
                if context.expanded.is_empty() {
                    debug!("Timer start ignored - no expanded stages");
                    return Handled;
                }
                context.rewind();
                context.countdown_time = Some(COUNTDOWN_SECONDS);
                context.emit(TimerOutput::CountdownStarted {
                    seconds: COUNTDOWN_SECONDS,
                });
                Transition(State::countdown())
            }
            // Reset is idempotent
            TimerInput::Reset => {
                context.rewind();
                Handled
            }
            _ => Handled,
        }
    }

    /// Pre-brew countdown. A countdown is not resumable: pause aborts it.
    #[state]
    fn countdown(context: &mut TimerContext, event: &TimerInput) -> Response<State> {
        use Response::*;

        match event {
            TimerInput::Tick => {
                let remaining = context.countdown_time.unwrap_or(0).saturating_sub(1);
                if remaining == 0 {
                    context.countdown_time = None;
                    context.emit(TimerOutput::TimingStarted);
                    Transition(State::running())
                } else {
                    context.countdown_time = Some(remaining);
                    context.emit(TimerOutput::CountdownTick { remaining });
                    Handled
                }
            }
            TimerInput::Pause | TimerInput::Reset => {
                context.rewind();
                context.emit(TimerOutput::Reset);
                Transition(State::idle())
            }
            _ => Handled,
        }
    }

    /// Active brew timing, one second per tick.
    #[state]
    fn running(context: &mut TimerContext, event: &TimerInput) -> Response<State> {
        use Response::*;

        match event {
            TimerInput::Tick => {
                context.current_time += 1;

                if context.current_time >= context.total_duration() {
                    context.show_complete = true;
                    context.emit(TimerOutput::Finished {
                        total_time: context.current_time,
                    });
                    return Transition(State::complete());
                }

                if let Some(stage) = stage_at(&context.expanded, context.current_time) {
                    if stage != context.current_stage {
                        context.emit(TimerOutput::StageAdvanced {
                            from: context.current_stage,
                            to: stage,
                        });
                        context.current_stage = stage;
                    }
                }
                Handled
            }
            TimerInput::Pause => {
                context.emit(TimerOutput::Paused);
                Transition(State::paused())
            }
            TimerInput::Reset => {
                context.rewind();
                context.emit(TimerOutput::Reset);
                Transition(State::idle())
            }
            _ => Handled,
        }
    }

    /// Paused mid-brew; elapsed time and stage are preserved.
    #[state]
    fn paused(context: &mut TimerContext, event: &TimerInput) -> Response<State> {
        use Response::*;

        match event {
            TimerInput::Resume | TimerInput::Start => {
                context.emit(TimerOutput::Resumed);
                Transition(State::running())
            }
            TimerInput::Reset => {
                context.rewind();
                context.emit(TimerOutput::Reset);
                Transition(State::idle())
            }
            _ => Handled,
        }
    }

    /// Brew finished; final time stays visible until reset or restart.
    #[state]
    fn complete(context: &mut TimerContext, event: &TimerInput) -> Response<State> {
        use Response::*;

        match event {
            TimerInput::Start => {
                if context.expanded.is_empty() {
                    return Handled;
                }
                context.rewind();
                context.countdown_time = Some(COUNTDOWN_SECONDS);
                context.emit(TimerOutput::CountdownStarted {
                    seconds: COUNTDOWN_SECONDS,
                });
                Transition(State::countdown())
            }
            TimerInput::Reset => {
                context.rewind();
                context.emit(TimerOutput::Reset);
                Transition(State::idle())
            }
            _ => Handled,
        }
    }

    fn on_transition(&mut self, source: &State, target: &State) {
        info!("⏱️ Timer transition: {:?} -> {:?}", source, target);
    }

    fn state_to_phase(state: &State) -> TimerPhase {
        match state {
            State::Idle {} => TimerPhase::Idle,
            State::Countdown {} => TimerPhase::Countdown,
            State::Running {} => TimerPhase::Running,
            State::Paused {} => TimerPhase::Paused,
            State::Complete {} => TimerPhase::Complete,
        }
    }
}

// Main interface for the timer state machine
pub struct BrewTimer {
    machine: statig::prelude::StateMachine<BrewTimerMachine>,
    context: TimerContext,
}

impl BrewTimer {
    pub fn new() -> Self {
        Self {
            machine: BrewTimerMachine::default().state_machine(),
            context: TimerContext::default(),
        }
    }

    /// Process an input event and return collected output events.
    pub fn handle_input(&mut self, input: TimerInput) -> heapless::Vec<TimerOutput, 8> {
        self.context.outputs.clear();
        let _ = self.machine.handle_with_context(&input, &mut self.context);
        std::mem::take(&mut self.context.outputs)
    }

    /// Replace the expanded stage sequence; resets all timer fields.
    pub fn set_stages(&mut self, expanded: Vec<ExpandedStage>) {
        let _ = self.handle_input(TimerInput::Reset);
        self.context.expanded = expanded;
    }

    /// Stop without losing the finished-brew view: rewinds the stage cursor
    /// and clears any countdown, preserving the final time when the brew is
    /// complete. Anything else is a full reset.
    pub fn stop_for_review(&mut self) {
        if self.context.show_complete {
            self.context.current_stage = 0;
            self.context.countdown_time = None;
        } else {
            let _ = self.handle_input(TimerInput::Reset);
        }
    }

    pub fn phase(&self) -> TimerPhase {
        BrewTimerMachine::state_to_phase(self.machine.state())
    }

    /// Running in the brewing sense: countdown counts as running so the
    /// navigation guard locks the flow as soon as the user starts.
    pub fn is_running(&self) -> bool {
        matches!(self.phase(), TimerPhase::Countdown | TimerPhase::Running)
    }

    pub fn current_time(&self) -> u32 {
        self.context.current_time
    }

    pub fn current_stage(&self) -> usize {
        self.context.current_stage
    }

    pub fn countdown_time(&self) -> Option<u32> {
        self.context.countdown_time
    }

    pub fn show_complete(&self) -> bool {
        self.context.show_complete
    }

    pub fn expanded(&self) -> &[ExpandedStage] {
        &self.context.expanded
    }
}

impl Default for BrewTimer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::expand;
    use crate::types::Stage;

    fn stages() -> Vec<ExpandedStage> {
        expand(&[
            Stage {
                time: 5,
                label: "焖蒸".to_string(),
                water: "30g".to_string(),
                detail: String::new(),
                pour_time: Some(2),
                pour_type: "circle".to_string(),
                valve_status: None,
            },
            Stage {
                time: 10,
                label: "注水".to_string(),
                water: "225g".to_string(),
                detail: String::new(),
                pour_time: Some(5),
                pour_type: "circle".to_string(),
                valve_status: None,
            },
        ])
    }

    fn started_timer() -> BrewTimer {
        let mut timer = BrewTimer::new();
        timer.set_stages(stages());
        timer.handle_input(TimerInput::Start);
        // burn down the countdown
        for _ in 0..COUNTDOWN_SECONDS {
            timer.handle_input(TimerInput::Tick);
        }
        timer
    }

    #[test]
    fn test_start_without_stages_is_ignored() {
        let mut timer = BrewTimer::new();
        let outputs = timer.handle_input(TimerInput::Start);
        assert!(outputs.is_empty());
        assert_eq!(timer.phase(), TimerPhase::Idle);
    }

    #[test]
    fn test_countdown_then_running() {
        let mut timer = BrewTimer::new();
        timer.set_stages(stages());

        let outputs = timer.handle_input(TimerInput::Start);
        assert!(outputs.contains(&TimerOutput::CountdownStarted {
            seconds: COUNTDOWN_SECONDS
        }));
        assert_eq!(timer.phase(), TimerPhase::Countdown);
        assert!(timer.is_running());

        for _ in 0..COUNTDOWN_SECONDS - 1 {
            timer.handle_input(TimerInput::Tick);
        }
        let outputs = timer.handle_input(TimerInput::Tick);
        assert!(outputs.contains(&TimerOutput::TimingStarted));
        assert_eq!(timer.phase(), TimerPhase::Running);
        assert_eq!(timer.countdown_time(), None);
    }

    #[test]
    fn test_pause_aborts_countdown() {
        let mut timer = BrewTimer::new();
        timer.set_stages(stages());
        timer.handle_input(TimerInput::Start);
        timer.handle_input(TimerInput::Pause);
        assert_eq!(timer.phase(), TimerPhase::Idle);
        assert_eq!(timer.countdown_time(), None);
    }

    #[test]
    fn test_stage_advances_and_finishes() {
        let mut timer = started_timer();

        // pour[0,2) wait[2,5) pour[5,10)
        timer.handle_input(TimerInput::Tick); // t=1
        let outputs = timer.handle_input(TimerInput::Tick); // t=2
        assert!(outputs.contains(&TimerOutput::StageAdvanced { from: 0, to: 1 }));

        for _ in 0..7 {
            timer.handle_input(TimerInput::Tick); // t=9
        }
        assert_eq!(timer.current_stage(), 2);

        let outputs = timer.handle_input(TimerInput::Tick); // t=10
        assert!(outputs.contains(&TimerOutput::Finished { total_time: 10 }));
        assert_eq!(timer.phase(), TimerPhase::Complete);
        assert!(timer.show_complete());
        assert!(!timer.is_running());
    }

    #[test]
    fn test_pause_resume_preserves_time() {
        let mut timer = started_timer();
        timer.handle_input(TimerInput::Tick);
        timer.handle_input(TimerInput::Pause);
        assert_eq!(timer.phase(), TimerPhase::Paused);
        assert_eq!(timer.current_time(), 1);

        timer.handle_input(TimerInput::Resume);
        assert_eq!(timer.phase(), TimerPhase::Running);
        assert_eq!(timer.current_time(), 1);
    }

    #[test]
    fn test_reset_is_idempotent() {
        let mut timer = started_timer();
        timer.handle_input(TimerInput::Tick);
        timer.handle_input(TimerInput::Reset);
        assert_eq!(timer.phase(), TimerPhase::Idle);
        assert_eq!(timer.current_time(), 0);

        let outputs = timer.handle_input(TimerInput::Reset);
        assert!(outputs.is_empty());
        assert_eq!(timer.phase(), TimerPhase::Idle);
    }

    #[test]
    fn test_stop_for_review_preserves_final_time() {
        let mut timer = started_timer();
        for _ in 0..10 {
            timer.handle_input(TimerInput::Tick);
        }
        assert!(timer.show_complete());

        timer.stop_for_review();
        assert_eq!(timer.current_time(), 10);
        assert_eq!(timer.current_stage(), 0);
        assert!(timer.show_complete());
    }
}
