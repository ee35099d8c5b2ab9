//! Keyboard/mouse emulation
//!
//! [`KeyMouseEmulator`] is the output sink that turns controller frames into
//! synthetic input. Buttons and the D-pad are driven by edges; sticks are
//! either four threshold-gated digital directions or a pointer-delta source
//! feeding the [`DeltaAccumulator`].

use crate::backend::{Key, KeyboardBackend, MouseBackend, MouseButton};
use crate::bigben::{Button, Dpad, StickType, StickVector};
use crate::mapping::accumulator::{flush_once, DeltaAccumulator, MouseFlusher};
use crate::mapping::config::{Binding, Config, ConfigError, KeyMapping, StickBinding};
use crate::mapping::edge::Edge;
use crate::mapping::sink::{Frame, OutputSink};
use log::{debug, info, trace, warn};
use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::time::Duration;

/// Cardinal direction, for the D-pad and stick-as-digital inputs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [Direction::Up, Direction::Down, Direction::Left, Direction::Right];

    fn index(self) -> usize {
        self as usize
    }
}

/// Something on the host side that can be held down
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Output {
    Key(Key),
    Mouse(MouseButton),
}

/// Which controller input claimed an output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
enum Source {
    Button(Button),
    Dpad(Direction),
    Stick(StickType, Direction),
}

/// Held outputs and the inputs holding them.
///
/// An output is injected down when its first source claims it and up when
/// its last source lets go. Repeating a claim or releasing an unclaimed
/// output does nothing.
#[derive(Debug, Default)]
struct HeldState {
    claims: BTreeMap<Output, BTreeSet<Source>>,
}

impl HeldState {
    fn press<K: KeyboardBackend, M: MouseBackend>(
        &mut self,
        output: Output,
        source: Source,
        keyboard: &K,
        mouse: &M,
    ) {
        let sources = self.claims.entry(output).or_default();
        let first = sources.is_empty();
        if !sources.insert(source) {
            return;
        }
        if first {
            inject(output, true, keyboard, mouse);
            trace!("{:?} down (source {:?})", output, source);
        } else {
            trace!("{:?} additional claim {:?} -> {} sources", output, source, sources.len());
        }
    }

    fn release<K: KeyboardBackend, M: MouseBackend>(
        &mut self,
        output: Output,
        source: Source,
        keyboard: &K,
        mouse: &M,
    ) {
        let Some(sources) = self.claims.get_mut(&output) else {
            return;
        };
        if !sources.remove(&source) {
            return;
        }
        if sources.is_empty() {
            self.claims.remove(&output);
            inject(output, false, keyboard, mouse);
            trace!("{:?} up (source {:?})", output, source);
        }
    }

    fn clear_all<K: KeyboardBackend, M: MouseBackend>(&mut self, keyboard: &K, mouse: &M) {
        for output in std::mem::take(&mut self.claims).into_keys().rev() {
            inject(output, false, keyboard, mouse);
        }
    }

    fn outputs(&self) -> Vec<Output> {
        self.claims.keys().copied().collect()
    }
}

fn inject<K: KeyboardBackend, M: MouseBackend>(output: Output, down: bool, keyboard: &K, mouse: &M) {
    let result = match (output, down) {
        (Output::Key(k), true) => keyboard.key_down(k),
        (Output::Key(k), false) => keyboard.key_up(k),
        (Output::Mouse(b), true) => mouse.button_down(b),
        (Output::Mouse(b), false) => mouse.button_up(b),
    };
    if let Err(e) = result {
        warn!(
            "Failed to {} {:?}: {}",
            if down { "press" } else { "release" },
            output,
            e
        );
    }
}

/// Keyboard/mouse output sink
pub struct KeyMouseEmulator<K, M>
where
    K: KeyboardBackend,
    M: MouseBackend + Clone + Send + 'static,
{
    mappings: Vec<KeyMapping>,
    current_profile_index: usize,

    sensitivity_factors: Vec<f64>,
    current_sensitivity_index: usize,

    /// Shaped deflection that counts as a digital press
    digital_threshold: f64,

    keyboard: K,
    mouse: M,
    held_state: HeldState,

    /// Digital direction state per stick, indexed by [`Direction::index`]
    stick_directions: [[bool; 4]; 2],

    accumulator: DeltaAccumulator,
    flush_interval: Duration,
    flusher: Option<MouseFlusher>,
}

impl<K, M> KeyMouseEmulator<K, M>
where
    K: KeyboardBackend,
    M: MouseBackend + Clone + Send + 'static,
{
    /// Resolve every profile of `config` up front; unknown key names fail here
    pub fn new(config: &Config, keyboard: K, mouse: M) -> Result<Self, ConfigError> {
        let mappings = config
            .profiles
            .iter()
            .map(KeyMapping::from_profile)
            .collect::<Result<Vec<_>, _>>()?;

        if mappings.is_empty() {
            return Err(ConfigError::Invalid("At least one profile is required".into()));
        }

        let current_profile_index = config.default_profile_index();
        info!("Starting with profile: '{}'", mappings[current_profile_index].name);

        Ok(Self {
            mappings,
            current_profile_index,
            sensitivity_factors: config.settings.sensitivity_factor.clone(),
            current_sensitivity_index: 0,
            digital_threshold: config.settings.digital_threshold,
            keyboard,
            mouse,
            held_state: HeldState::default(),
            stick_directions: [[false; 4]; 2],
            accumulator: DeltaAccumulator::new(),
            flush_interval: config.settings.flush_interval(),
            flusher: None,
        })
    }

    /// Start the fixed-rate pointer flush thread. Idempotent.
    pub fn start_flush_clock(&mut self) -> io::Result<()> {
        if self.flusher.is_none() {
            self.flusher = Some(MouseFlusher::spawn(
                self.accumulator.clone(),
                self.mouse.clone(),
                self.flush_interval,
            )?);
        }
        Ok(())
    }

    /// Stop the flush thread, discarding pending motion
    pub fn stop_flush_clock(&mut self) {
        if let Some(mut flusher) = self.flusher.take() {
            flusher.stop();
        }
    }

    /// Inject any pending pointer motion now
    pub fn flush_now(&self) -> bool {
        flush_once(&self.accumulator, &self.mouse)
    }

    pub fn accumulator(&self) -> &DeltaAccumulator {
        &self.accumulator
    }

    pub fn current_profile_name(&self) -> &str {
        &self.current_mapping().name
    }

    pub fn sensitivity_factor(&self) -> f64 {
        self.sensitivity_factors
            .get(self.current_sensitivity_index)
            .copied()
            .unwrap_or(1.0)
    }

    /// Outputs currently held down on the host
    pub fn held_outputs(&self) -> Vec<Output> {
        self.held_state.outputs()
    }

    pub fn keyboard(&self) -> &K {
        &self.keyboard
    }

    pub fn mouse(&self) -> &M {
        &self.mouse
    }

    fn current_mapping(&self) -> &KeyMapping {
        // Index is always in range: set from a non-empty list and cycled modulo its length
        &self.mappings[self.current_profile_index]
    }

    fn press_binding(&mut self, binding: &Binding, source: Source) {
        match binding {
            Binding::Keys(keys) => {
                for key in keys {
                    self.held_state.press(Output::Key(*key), source, &self.keyboard, &self.mouse);
                }
            }
            Binding::Mouse(button) => {
                self.held_state.press(Output::Mouse(*button), source, &self.keyboard, &self.mouse);
            }
            Binding::CycleProfiles => self.cycle_profiles(),
            Binding::CycleSensitivity => self.cycle_sensitivity(),
        }
    }

    fn release_binding(&mut self, binding: &Binding, source: Source) {
        match binding {
            Binding::Keys(keys) => {
                for key in keys.iter().rev() {
                    self.held_state.release(Output::Key(*key), source, &self.keyboard, &self.mouse);
                }
            }
            Binding::Mouse(button) => {
                self.held_state.release(Output::Mouse(*button), source, &self.keyboard, &self.mouse);
            }
            Binding::CycleProfiles | Binding::CycleSensitivity => {}
        }
    }

    fn on_button(&mut self, button: Button, pressed: bool) {
        let Some(bindings) = self.current_mapping().buttons.get(&button).cloned() else {
            return;
        };
        let source = Source::Button(button);
        for binding in &bindings {
            if pressed {
                self.press_binding(binding, source);
            } else {
                self.release_binding(binding, source);
            }
        }
    }

    fn on_dpad(&mut self, from: Dpad, to: Dpad) {
        let before = direction_flags(from);
        let after = direction_flags(to);
        let bindings = self.current_mapping().dpad.clone();
        let bindings = bindings.as_array();

        // Releases before presses, so a rolling NE -> E -> SE never holds both
        for dir in Direction::ALL {
            if before[dir.index()] && !after[dir.index()] {
                if let Some(binding) = bindings[dir.index()] {
                    self.release_binding(binding, Source::Dpad(dir));
                }
            }
        }
        for dir in Direction::ALL {
            if !before[dir.index()] && after[dir.index()] {
                if let Some(binding) = bindings[dir.index()] {
                    self.press_binding(binding, Source::Dpad(dir));
                }
            }
        }
    }

    fn on_stick(&mut self, stick: StickType, vector: StickVector) {
        match self.current_mapping().stick(stick).clone() {
            StickBinding::Disabled => {}
            StickBinding::Mouse { sensitivity, invert_y } => {
                let scale = sensitivity * self.sensitivity_factor();
                let dy = if invert_y { -vector.y } else { vector.y };
                if vector.x != 0.0 || dy != 0.0 {
                    self.accumulator.add(vector.x * scale, dy * scale);
                }
            }
            StickBinding::Directional { invert_y, directions } => {
                let t = self.digital_threshold;
                // Negative Y is up unless inverted
                let (up, down) = if invert_y {
                    (vector.y > t, vector.y < -t)
                } else {
                    (vector.y < -t, vector.y > t)
                };
                let wanted = [up, down, vector.x < -t, vector.x > t];
                let idx = stick as usize;
                let bindings = directions.as_array();

                for dir in Direction::ALL {
                    let i = dir.index();
                    if wanted[i] == self.stick_directions[idx][i] {
                        continue;
                    }
                    self.stick_directions[idx][i] = wanted[i];
                    if let Some(binding) = bindings[i] {
                        if wanted[i] {
                            self.press_binding(binding, Source::Stick(stick, dir));
                        } else {
                            self.release_binding(binding, Source::Stick(stick, dir));
                        }
                    }
                }
            }
        }
    }

    /// Switch to the next profile, releasing everything held first
    fn cycle_profiles(&mut self) {
        let old_name = self.current_mapping().name.clone();
        self.release_everything();
        self.current_profile_index = (self.current_profile_index + 1) % self.mappings.len();
        info!("🔄 Cycled profile: '{}' -> '{}'", old_name, self.current_mapping().name);
    }

    fn cycle_sensitivity(&mut self) {
        if self.sensitivity_factors.is_empty() {
            return;
        }
        let old_factor = self.sensitivity_factor();
        self.current_sensitivity_index =
            (self.current_sensitivity_index + 1) % self.sensitivity_factors.len();
        info!("🎯 Sensitivity: {:.1}x -> {:.1}x", old_factor, self.sensitivity_factor());
    }

    fn release_everything(&mut self) {
        self.held_state.clear_all(&self.keyboard, &self.mouse);
        self.stick_directions = [[false; 4]; 2];
        self.accumulator.clear();
    }
}

/// (up, down, left, right) as an array indexed by [`Direction::index`]
fn direction_flags(dpad: Dpad) -> [bool; 4] {
    let (up, down, left, right) = dpad.components();
    [up, down, left, right]
}

impl<K, M> OutputSink for KeyMouseEmulator<K, M>
where
    K: KeyboardBackend,
    M: MouseBackend + Clone + Send + 'static,
{
    fn consume(&mut self, frame: &Frame) {
        for edge in &frame.edges {
            match *edge {
                Edge::ButtonPressed(button) => self.on_button(button, true),
                Edge::ButtonReleased(button) => self.on_button(button, false),
                Edge::DpadChanged(from, to) => self.on_dpad(from, to),
            }
        }
        self.on_stick(StickType::Left, frame.shaped.left);
        self.on_stick(StickType::Right, frame.shaped.right);
    }

    fn release_all(&mut self) {
        if !self.held_state.claims.is_empty() {
            debug!("Releasing {} held outputs", self.held_state.claims.len());
        }
        self.release_everything();
    }
}

impl<K, M> Drop for KeyMouseEmulator<K, M>
where
    K: KeyboardBackend,
    M: MouseBackend + Clone + Send + 'static,
{
    fn drop(&mut self) {
        self.stop_flush_clock();
        self.release_everything();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{KeyEvent, MockKeyboardBackend, MockMouseBackend, MouseEvent};
    use crate::bigben::ShapedAxes;
    use crate::mapping::config::{Action, DirectionalActions, Profile, Settings, StickMapping, StickMode};

    fn key(name: &str) -> Action {
        Action::Key { key: name.to_string() }
    }

    fn wasd() -> DirectionalActions {
        DirectionalActions { up: key("w"), down: key("s"), left: key("a"), right: key("d") }
    }

    fn config() -> Config {
        let mut base = Profile::new("base");
        base.buttons.insert(Button::A, vec![key("space")]);
        base.buttons.insert(Button::B, vec![key("space")]);
        base.buttons.insert(Button::LB, vec![key("shift+w")]);
        base.buttons.insert(Button::RT, vec![Action::Mouse { button: MouseButton::Left }]);
        base.buttons.insert(Button::Home, vec![Action::CycleProfiles]);
        base.buttons.insert(Button::Back, vec![Action::CycleSensitivity]);
        base.buttons.insert(Button::X, vec![Action::None]);
        base.dpad = DirectionalActions { up: key("up"), down: key("down"), left: key("left"), right: key("right") };
        base.sticks.left = Some(StickMapping {
            mode: StickMode::Directional,
            sensitivity: 10.0,
            invert_y: false,
            directions: wasd(),
        });
        base.sticks.right = Some(StickMapping {
            mode: StickMode::Mouse,
            sensitivity: 10.0,
            invert_y: false,
            directions: DirectionalActions::default(),
        });

        let mut menu = Profile::new("menu");
        menu.buttons.insert(Button::A, vec![key("enter")]);
        menu.buttons.insert(Button::Home, vec![Action::CycleProfiles]);

        Config { settings: Settings::default(), profiles: vec![base, menu] }
    }

    fn emulator() -> KeyMouseEmulator<MockKeyboardBackend, MockMouseBackend> {
        KeyMouseEmulator::new(&config(), MockKeyboardBackend::new(), MockMouseBackend::new()).unwrap()
    }

    fn edges(edges: Vec<Edge>) -> Frame {
        Frame { state: Default::default(), shaped: ShapedAxes::default(), edges }
    }

    fn sticks(left: (f64, f64), right: (f64, f64)) -> Frame {
        Frame {
            state: Default::default(),
            shaped: ShapedAxes {
                left: StickVector { x: left.0, y: left.1 },
                right: StickVector { x: right.0, y: right.1 },
                ..Default::default()
            },
            edges: Vec::new(),
        }
    }

    #[test]
    fn button_edges_press_and_release_keys() {
        let mut emu = emulator();
        emu.consume(&edges(vec![Edge::ButtonPressed(Button::A)]));
        assert_eq!(emu.held_outputs(), vec![Output::Key(Key::Space)]);
        emu.consume(&edges(vec![Edge::ButtonReleased(Button::A)]));
        assert!(emu.held_outputs().is_empty());
        assert_eq!(
            emu.keyboard().events(),
            vec![KeyEvent::Down(Key::Space), KeyEvent::Up(Key::Space)]
        );
    }

    #[test]
    fn press_is_idempotent() {
        let mut emu = emulator();
        emu.consume(&edges(vec![Edge::ButtonPressed(Button::A)]));
        emu.consume(&edges(vec![Edge::ButtonPressed(Button::A)]));
        emu.consume(&edges(vec![Edge::ButtonReleased(Button::A)]));
        emu.consume(&edges(vec![Edge::ButtonReleased(Button::A)]));
        assert_eq!(
            emu.keyboard().events(),
            vec![KeyEvent::Down(Key::Space), KeyEvent::Up(Key::Space)]
        );
    }

    #[test]
    fn shared_key_stays_down_until_last_source_releases() {
        let mut emu = emulator();
        emu.consume(&edges(vec![Edge::ButtonPressed(Button::A), Edge::ButtonPressed(Button::B)]));
        emu.consume(&edges(vec![Edge::ButtonReleased(Button::A)]));
        assert_eq!(emu.held_outputs(), vec![Output::Key(Key::Space)]);
        emu.consume(&edges(vec![Edge::ButtonReleased(Button::B)]));
        assert!(emu.held_outputs().is_empty());
        assert_eq!(emu.keyboard().events().len(), 2);
    }

    #[test]
    fn combo_releases_in_reverse() {
        let mut emu = emulator();
        emu.consume(&edges(vec![Edge::ButtonPressed(Button::LB)]));
        emu.consume(&edges(vec![Edge::ButtonReleased(Button::LB)]));
        assert_eq!(
            emu.keyboard().events(),
            vec![
                KeyEvent::Down(Key::Shift),
                KeyEvent::Down(Key::W),
                KeyEvent::Up(Key::W),
                KeyEvent::Up(Key::Shift)
            ]
        );
    }

    #[test]
    fn disabled_and_unmapped_inputs_do_nothing() {
        let mut emu = emulator();
        emu.consume(&edges(vec![Edge::ButtonPressed(Button::X), Edge::ButtonPressed(Button::Y)]));
        assert!(emu.keyboard().events().is_empty());
        assert!(emu.mouse().events().is_empty());
    }

    #[test]
    fn mouse_button_binding() {
        let mut emu = emulator();
        emu.consume(&edges(vec![Edge::ButtonPressed(Button::RT)]));
        emu.consume(&edges(vec![Edge::ButtonReleased(Button::RT)]));
        assert_eq!(
            emu.mouse().events(),
            vec![MouseEvent::Down(MouseButton::Left), MouseEvent::Up(MouseButton::Left)]
        );
    }

    #[test]
    fn dpad_diagonal_roll() {
        let mut emu = emulator();
        emu.consume(&edges(vec![Edge::DpadChanged(Dpad::Neutral, Dpad::NE)]));
        emu.consume(&edges(vec![Edge::DpadChanged(Dpad::NE, Dpad::E)]));
        emu.consume(&edges(vec![Edge::DpadChanged(Dpad::E, Dpad::Neutral)]));
        assert_eq!(
            emu.keyboard().events(),
            vec![
                KeyEvent::Down(Key::Up),
                KeyEvent::Down(Key::Right),
                KeyEvent::Up(Key::Up),
                KeyEvent::Up(Key::Right)
            ]
        );
    }

    #[test]
    fn stick_directions_follow_threshold_crossings() {
        let mut emu = emulator();
        emu.consume(&sticks((0.0, -0.8), (0.0, 0.0)));
        emu.consume(&sticks((0.0, -0.9), (0.0, 0.0)));
        assert_eq!(emu.held_outputs(), vec![Output::Key(Key::W)]);

        emu.consume(&sticks((0.7, -0.2), (0.0, 0.0)));
        assert_eq!(emu.held_outputs(), vec![Output::Key(Key::D)]);

        emu.consume(&sticks((0.0, 0.0), (0.0, 0.0)));
        assert!(emu.held_outputs().is_empty());
        assert_eq!(
            emu.keyboard().events(),
            vec![KeyEvent::Down(Key::W), KeyEvent::Up(Key::W), KeyEvent::Down(Key::D), KeyEvent::Up(Key::D)]
        );
    }

    #[test]
    fn mouse_stick_accumulates_until_flushed() {
        let mut emu = emulator();
        emu.consume(&sticks((0.0, 0.0), (0.5, -0.25)));
        emu.consume(&sticks((0.0, 0.0), (0.5, -0.25)));
        assert!(emu.mouse().events().is_empty());

        assert!(emu.flush_now());
        assert_eq!(emu.mouse().events(), vec![MouseEvent::Move { dx: 10, dy: -5 }]);
        assert!(!emu.flush_now());
    }

    #[test]
    fn sensitivity_cycles_scale_motion() {
        let mut emu = emulator();
        assert_eq!(emu.sensitivity_factor(), 1.0);
        emu.consume(&edges(vec![Edge::ButtonPressed(Button::Back)]));
        assert_eq!(emu.sensitivity_factor(), 2.0);

        emu.consume(&sticks((0.0, 0.0), (1.0, 0.0)));
        emu.flush_now();
        assert_eq!(emu.mouse().total_motion(), (20, 0));

        emu.consume(&edges(vec![Edge::ButtonPressed(Button::Back)]));
        emu.consume(&edges(vec![Edge::ButtonPressed(Button::Back)]));
        assert_eq!(emu.sensitivity_factor(), 1.0);
    }

    #[test]
    fn profile_cycle_releases_held_outputs() {
        let mut emu = emulator();
        emu.consume(&edges(vec![Edge::ButtonPressed(Button::A)]));
        emu.consume(&sticks((-0.9, 0.0), (0.0, 0.0)));
        assert_eq!(emu.held_outputs().len(), 2);

        emu.consume(&edges(vec![Edge::ButtonPressed(Button::Home)]));
        assert_eq!(emu.current_profile_name(), "menu");
        assert!(emu.held_outputs().is_empty());
        assert!(emu.keyboard().keys_down().is_empty());

        // Releasing A under the new profile is harmless
        emu.consume(&edges(vec![Edge::ButtonReleased(Button::A)]));
        emu.consume(&edges(vec![Edge::ButtonPressed(Button::A)]));
        assert_eq!(emu.held_outputs(), vec![Output::Key(Key::Enter)]);

        emu.consume(&edges(vec![Edge::ButtonPressed(Button::Home)]));
        assert_eq!(emu.current_profile_name(), "base");
    }

    #[test]
    fn release_all_leaves_nothing_held() {
        let mut emu = emulator();
        emu.consume(&edges(vec![
            Edge::ButtonPressed(Button::A),
            Edge::ButtonPressed(Button::RT),
            Edge::DpadChanged(Dpad::Neutral, Dpad::SW),
        ]));
        emu.consume(&sticks((0.0, 0.9), (1.0, 1.0)));
        assert!(!emu.held_outputs().is_empty());

        emu.release_all();
        assert!(emu.held_outputs().is_empty());
        assert!(emu.keyboard().keys_down().is_empty());
        assert!(emu.mouse().buttons_down().is_empty());
        // Pending motion is discarded too
        assert!(!emu.flush_now());
    }

    #[test]
    fn unknown_key_fails_construction() {
        let mut config = config();
        config.profiles[1].buttons.insert(Button::B, vec![key("nope")]);
        let result = KeyMouseEmulator::new(&config, MockKeyboardBackend::new(), MockMouseBackend::new());
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn drop_releases_held_keys() {
        let keyboard = MockKeyboardBackend::new();
        {
            let mut emu =
                KeyMouseEmulator::new(&config(), keyboard.clone(), MockMouseBackend::new()).unwrap();
            emu.consume(&edges(vec![Edge::ButtonPressed(Button::A)]));
            assert_eq!(keyboard.keys_down().len(), 1);
        }
        assert!(keyboard.keys_down().is_empty());
    }
}
