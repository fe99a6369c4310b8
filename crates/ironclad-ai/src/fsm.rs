use crate::agent::AgentCore;
use crate::world::{CombatSink, GridWorldQuery};
use ironclad_core::{AgentConfig, Dt};
use std::collections::{HashMap, HashSet};

/// Key type of a [`FiniteStateMachine`], usually a fieldless enum.
pub trait StateIdentifier:
    std::fmt::Debug + std::fmt::Display + Clone + Copy + std::hash::Hash + Eq + Send + Sync + 'static
{
    /// Stable name used in logs and snapshots.
    fn as_str(&self) -> &'static str;
}

/// Behaviour attached to one state id.
///
/// Every hook has an empty default, so a state implements only what it needs.
pub trait State<S: StateIdentifier>: std::fmt::Debug + Send + Sync {
    /// Runs once on entry, before the first `on_update`.
    fn on_enter(&mut self, _context: &mut StateContext<'_>) {}

    /// Called every tick while in this state, after transitions were checked.
    ///
    /// # Arguments
    ///
    /// * `_context` - A mutable reference to the state context.
    /// * `_dt` - The duration since the last tick.
    fn on_update(&mut self, _context: &mut StateContext<'_>, _dt: Dt) {}

    /// Runs once when another state takes over.
    fn on_exit(&mut self, _context: &mut StateContext<'_>) {}

    /// Check for state transitions and return the next state Id if a transition should occur.
    ///
    /// # Arguments
    ///
    /// * `_context` - A reference to the state context.
    ///
    /// # Returns
    ///
    /// The next state Id if a transition should occur.
    fn check_transitions(&self, _context: &StateContext<'_>) -> Option<S> {
        None
    }
}

/// Context passed to states for decision making and data access.
///
/// Borrows the agent's mutable core together with the read-only world, the
/// outgoing command sink and the tuning block for the duration of one tick.
pub struct StateContext<'a> {
    pub core: &'a mut AgentCore,
    pub world: &'a dyn GridWorldQuery,
    pub sink: &'a dyn CombatSink,
    pub config: &'a AgentConfig,
    /// Time since the current state was entered.
    pub time_in_state: Dt,
}

impl std::fmt::Debug for StateContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateContext")
            .field("agent", &self.core.id)
            .field("time_in_state", &self.time_in_state)
            .finish_non_exhaustive()
    }
}

/// Transition checked from every non-terminal state before the current
/// state's own [`State::check_transitions`].
///
/// Receives the current state id; returning it is treated as "no transition".
pub type AnyStateRule<S> = Box<dyn Fn(S, &StateContext<'_>) -> Option<S> + Send + Sync>;

/// Flat finite state machine.
///
/// Each update first evaluates the any-state rules in insertion order, then
/// the current state's own transition check, switches state if either asked
/// for it, and finally runs `on_update` of whichever state is now current.
/// Entering a terminal state disables the machine for good.
pub struct FiniteStateMachine<S: StateIdentifier> {
    /// States and their implementations.
    states: HashMap<S, Box<dyn State<S>>>,
    /// Rules that apply regardless of the current state.
    any_state_rules: Vec<AnyStateRule<S>>,
    /// States that end the machine.
    terminal_states: HashSet<S>,
    /// Current active state.
    current_state: Option<S>,
    /// Previously active state.
    previous_state: Option<S>,
    /// Accumulated tick time since the current state was entered.
    time_in_state: Dt,
    /// Whether the FSM is currently enabled.
    enabled: bool,
}

impl<S: StateIdentifier> std::fmt::Debug for FiniteStateMachine<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FiniteStateMachine")
            .field("current_state", &self.current_state)
            .field("previous_state", &self.previous_state)
            .field("time_in_state", &self.time_in_state)
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}

impl<S: StateIdentifier> FiniteStateMachine<S> {
    /// Create a new finite state machine.
    ///
    /// # Returns
    ///
    /// A new [`FiniteStateMachine`] instance.
    pub fn new() -> Self {
        Self {
            states: HashMap::new(),
            any_state_rules: Vec::new(),
            terminal_states: HashSet::new(),
            current_state: None,
            previous_state: None,
            time_in_state: Dt::ZERO,
            enabled: true,
        }
    }

    /// Add a state to the FSM.
    ///
    /// # Arguments
    ///
    /// * `id` - The identifier of the state.
    /// * `state` - The state to add.
    pub fn add_state(&mut self, id: S, state: Box<dyn State<S>>) {
        self.states.insert(id, state);
    }

    /// Add a transition rule evaluated from every non-terminal state.
    pub fn add_any_state_rule<F>(&mut self, rule: F)
    where
        F: Fn(S, &StateContext<'_>) -> Option<S> + Send + Sync + 'static,
    {
        self.any_state_rules.push(Box::new(rule));
    }

    /// Mark a state as terminal; entering it disables the machine.
    pub fn mark_terminal(&mut self, id: S) {
        self.terminal_states.insert(id);
    }

    pub fn is_terminal(&self, id: S) -> bool {
        self.terminal_states.contains(&id)
    }

    /// Set the initial state and enter it.
    ///
    /// # Arguments
    ///
    /// * `state_id` - The identifier of the state.
    /// * `context` - The state context.
    pub fn set_initial_state(&mut self, state_id: S, context: &mut StateContext<'_>) {
        if !self.states.contains_key(&state_id) {
            return;
        }
        self.current_state = Some(state_id);
        self.previous_state = None;
        self.enter(state_id, context);
    }

    pub fn current_state(&self) -> Option<S> {
        self.current_state
    }

    /// Get the previous state Id.
    pub fn previous_state(&self) -> Option<S> {
        self.previous_state
    }

    /// Time spent in the current state.
    pub fn time_in_state(&self) -> Dt {
        self.time_in_state
    }

    /// Force a transition to a specific state.
    ///
    /// Ignored for unknown states and once the machine is disabled.
    ///
    /// # Arguments
    ///
    /// * `new_state_id` - The new state identifier.
    /// * `context` - The state context.
    pub fn transition_to(&mut self, new_state_id: S, context: &mut StateContext<'_>) {
        if !self.enabled || !self.states.contains_key(&new_state_id) {
            return;
        }

        // Exit current state
        if let Some(current_id) = self.current_state {
            if let Some(state) = self.states.get_mut(&current_id) {
                state.on_exit(context);
            }
            self.previous_state = Some(current_id);
        }

        self.current_state = Some(new_state_id);
        self.enter(new_state_id, context);
    }

    fn enter(&mut self, state_id: S, context: &mut StateContext<'_>) {
        self.time_in_state = Dt::ZERO;
        context.time_in_state = Dt::ZERO;

        if let Some(state) = self.states.get_mut(&state_id) {
            state.on_enter(context);
        }

        if self.terminal_states.contains(&state_id) {
            self.enabled = false;
        }
    }

    /// Update the FSM.
    ///
    /// # Arguments
    ///
    /// * `context` - The state context.
    /// * `dt` - The duration since the last update.
    pub fn update(&mut self, context: &mut StateContext<'_>, dt: Dt) {
        if !self.enabled {
            return;
        }

        let Some(current) = self.current_state else {
            return;
        };

        self.time_in_state += dt;
        context.time_in_state = self.time_in_state;

        let next = self
            .any_state_rules
            .iter()
            .find_map(|rule| rule(current, &*context).filter(|next| *next != current))
            .or_else(|| {
                self.states
                    .get(&current)
                    .and_then(|state| state.check_transitions(&*context))
            });

        if let Some(next) = next
            && next != current
        {
            self.transition_to(next, context);
            if !self.enabled {
                return;
            }
        }

        if let Some(current) = self.current_state
            && let Some(state) = self.states.get_mut(&current)
        {
            state.on_update(context, dt);
        }
    }

    /// Enable or disable the FSM.
    ///
    /// A machine that entered a terminal state stays disabled.
    ///
    /// # Arguments
    ///
    /// * `enabled` - Whether to enable or disable the FSM.
    pub fn set_enabled(&mut self, enabled: bool) {
        let terminated = self
            .current_state
            .is_some_and(|state| self.terminal_states.contains(&state));
        self.enabled = enabled && !terminated;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl<S: StateIdentifier> Default for FiniteStateMachine<S> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentCore;
    use crate::grid::GridCell;
    use crate::intents::create_intent_channel;
    use crate::profile::AiProfile;
    use crate::world::{ProjectileHandle, TargetSnapshot, WorldBounds};
    use cgmath::Vector3;
    use ironclad_core::AgentId;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum TestState {
        Idle,
        Attack,
        Done,
    }

    impl std::fmt::Display for TestState {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{}", self.as_str())
        }
    }

    impl StateIdentifier for TestState {
        fn as_str(&self) -> &'static str {
            match self {
                TestState::Idle => "idle",
                TestState::Attack => "attack",
                TestState::Done => "done",
            }
        }
    }

    type EventLog = Arc<Mutex<Vec<String>>>;

    fn push(log: &EventLog, event: &str) {
        if let Ok(mut events) = log.lock() {
            events.push(event.to_string());
        }
    }

    fn events(log: &EventLog) -> Vec<String> {
        log.lock().map(|e| e.clone()).unwrap_or_default()
    }

    #[derive(Debug)]
    struct IdleState(EventLog);

    impl State<TestState> for IdleState {
        fn on_enter(&mut self, _context: &mut StateContext<'_>) {
            push(&self.0, "idle:enter");
        }

        fn on_update(&mut self, _context: &mut StateContext<'_>, _dt: Dt) {
            push(&self.0, "idle:update");
        }

        fn on_exit(&mut self, _context: &mut StateContext<'_>) {
            push(&self.0, "idle:exit");
        }

        fn check_transitions(&self, context: &StateContext<'_>) -> Option<TestState> {
            context.core.target.map(|_| TestState::Attack)
        }
    }

    #[derive(Debug)]
    struct AttackState(EventLog);

    impl State<TestState> for AttackState {
        fn on_enter(&mut self, _context: &mut StateContext<'_>) {
            push(&self.0, "attack:enter");
        }

        fn on_update(&mut self, _context: &mut StateContext<'_>, _dt: Dt) {
            push(&self.0, "attack:update");
        }
    }

    #[derive(Debug)]
    struct DoneState(EventLog);

    impl State<TestState> for DoneState {
        fn on_enter(&mut self, _context: &mut StateContext<'_>) {
            push(&self.0, "done:enter");
        }

        fn on_update(&mut self, _context: &mut StateContext<'_>, _dt: Dt) {
            push(&self.0, "done:update");
        }
    }

    struct EmptyWorld;

    impl GridWorldQuery for EmptyWorld {
        fn cell_size(&self) -> f32 {
            1.0
        }

        fn bounds(&self) -> WorldBounds {
            WorldBounds::new(-10.0, 10.0, -10.0, 10.0)
        }

        fn is_walkable(&self, _: GridCell) -> bool {
            true
        }

        fn raycast_blocked(&self, _: Vector3<f32>, _: Vector3<f32>, _: AgentId) -> bool {
            false
        }

        fn query_projectiles_in_radius(&self, _: Vector3<f32>, _: f32) -> Vec<ProjectileHandle> {
            Vec::new()
        }

        fn locate(&self, _: AgentId) -> Option<TargetSnapshot> {
            None
        }
    }

    fn machine(log: &EventLog) -> FiniteStateMachine<TestState> {
        let mut fsm = FiniteStateMachine::new();
        fsm.add_state(TestState::Idle, Box::new(IdleState(log.clone())));
        fsm.add_state(TestState::Attack, Box::new(AttackState(log.clone())));
        fsm.add_state(TestState::Done, Box::new(DoneState(log.clone())));
        fsm.mark_terminal(TestState::Done);
        fsm.add_any_state_rule(|_, ctx| (!ctx.core.health.is_alive()).then_some(TestState::Done));
        fsm
    }

    fn core() -> AgentCore {
        AgentCore::new(
            AgentId(1),
            Vector3::new(0.0, 0.0, 0.0),
            AiProfile::Patrolling.into(),
            7,
        )
    }

    const TICK: Duration = Duration::from_millis(100);

    #[test]
    fn test_fsm_creation() {
        let fsm: FiniteStateMachine<TestState> = FiniteStateMachine::new();
        assert!(fsm.current_state().is_none());
        assert!(fsm.is_enabled());
    }

    #[test]
    fn test_set_initial_state_enters() {
        let log = EventLog::default();
        let mut fsm = machine(&log);
        let mut core = core();
        let (sink, _rx) = create_intent_channel();
        let config = AgentConfig::default();
        let mut ctx = StateContext {
            core: &mut core,
            world: &EmptyWorld,
            sink: &sink,
            config: &config,
            time_in_state: Dt::ZERO,
        };

        fsm.set_initial_state(TestState::Idle, &mut ctx);
        assert_eq!(fsm.current_state(), Some(TestState::Idle));
        assert_eq!(events(&log), vec!["idle:enter"]);
    }

    #[test]
    fn test_update_and_time_in_state() {
        let log = EventLog::default();
        let mut fsm = machine(&log);
        let mut core = core();
        let (sink, _rx) = create_intent_channel();
        let config = AgentConfig::default();
        let mut ctx = StateContext {
            core: &mut core,
            world: &EmptyWorld,
            sink: &sink,
            config: &config,
            time_in_state: Dt::ZERO,
        };

        fsm.set_initial_state(TestState::Idle, &mut ctx);
        fsm.update(&mut ctx, TICK);
        fsm.update(&mut ctx, TICK);
        assert_eq!(fsm.time_in_state(), TICK * 2);
        assert_eq!(ctx.time_in_state, TICK * 2);
        assert_eq!(events(&log), vec!["idle:enter", "idle:update", "idle:update"]);
    }

    #[test]
    fn test_transition_runs_new_state_same_tick() {
        let log = EventLog::default();
        let mut fsm = machine(&log);
        let mut core = core();
        let (sink, _rx) = create_intent_channel();
        let config = AgentConfig::default();
        let mut ctx = StateContext {
            core: &mut core,
            world: &EmptyWorld,
            sink: &sink,
            config: &config,
            time_in_state: Dt::ZERO,
        };

        fsm.set_initial_state(TestState::Idle, &mut ctx);
        ctx.core.target = Some(AgentId(2));
        fsm.update(&mut ctx, TICK);

        assert_eq!(fsm.current_state(), Some(TestState::Attack));
        assert_eq!(fsm.previous_state(), Some(TestState::Idle));
        assert_eq!(fsm.time_in_state(), Dt::ZERO);
        assert_eq!(
            events(&log),
            vec!["idle:enter", "idle:exit", "attack:enter", "attack:update"]
        );
    }

    #[test]
    fn test_any_state_rule_preempts_and_terminates() {
        let log = EventLog::default();
        let mut fsm = machine(&log);
        let mut core = core();
        let (sink, _rx) = create_intent_channel();
        let config = AgentConfig::default();
        let mut ctx = StateContext {
            core: &mut core,
            world: &EmptyWorld,
            sink: &sink,
            config: &config,
            time_in_state: Dt::ZERO,
        };

        fsm.set_initial_state(TestState::Idle, &mut ctx);
        ctx.core.target = Some(AgentId(2));
        ctx.core.health.set_current(0.0);
        fsm.update(&mut ctx, TICK);

        // The any-state rule wins over Idle's own transition.
        assert_eq!(fsm.current_state(), Some(TestState::Done));
        assert!(!fsm.is_enabled());

        fsm.set_enabled(true);
        assert!(!fsm.is_enabled());
        fsm.transition_to(TestState::Idle, &mut ctx);
        fsm.update(&mut ctx, TICK);
        assert_eq!(fsm.current_state(), Some(TestState::Done));
        assert!(!events(&log).contains(&"done:update".to_string()));
    }

    #[test]
    fn test_enable_disable() {
        let log = EventLog::default();
        let mut fsm = machine(&log);
        let mut core = core();
        let (sink, _rx) = create_intent_channel();
        let config = AgentConfig::default();
        let mut ctx = StateContext {
            core: &mut core,
            world: &EmptyWorld,
            sink: &sink,
            config: &config,
            time_in_state: Dt::ZERO,
        };

        fsm.set_initial_state(TestState::Idle, &mut ctx);
        fsm.set_enabled(false);
        fsm.update(&mut ctx, TICK);
        assert_eq!(events(&log), vec!["idle:enter"]);

        fsm.set_enabled(true);
        fsm.update(&mut ctx, TICK);
        assert_eq!(events(&log), vec!["idle:enter", "idle:update"]);
    }

    #[test]
    fn test_unknown_state_is_ignored() {
        let log = EventLog::default();
        let mut fsm: FiniteStateMachine<TestState> = FiniteStateMachine::new();
        fsm.add_state(TestState::Idle, Box::new(IdleState(log.clone())));
        let mut core = core();
        let (sink, _rx) = create_intent_channel();
        let config = AgentConfig::default();
        let mut ctx = StateContext {
            core: &mut core,
            world: &EmptyWorld,
            sink: &sink,
            config: &config,
            time_in_state: Dt::ZERO,
        };

        fsm.set_initial_state(TestState::Attack, &mut ctx);
        assert!(fsm.current_state().is_none());
        fsm.set_initial_state(TestState::Idle, &mut ctx);
        fsm.transition_to(TestState::Done, &mut ctx);
        assert_eq!(fsm.current_state(), Some(TestState::Idle));
    }
}
