use winit::event::{ElementState, KeyEvent, MouseButton};
use winit::keyboard::{KeyCode, PhysicalKey};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotAction {
    Spin,
    Exit,
    ToggleStats,
}

#[inline(always)]
pub fn action_from_keycode(code: KeyCode) -> Option<SlotAction> {
    match code {
        KeyCode::Space | KeyCode::Enter | KeyCode::NumpadEnter => Some(SlotAction::Spin),
        KeyCode::Escape => Some(SlotAction::Exit),
        KeyCode::F3 => Some(SlotAction::ToggleStats),
        _ => None,
    }
}

/// Edge-triggered: only presses map to actions, and key repeat is ignored.
pub fn handle_keyboard_input(event: &KeyEvent) -> Option<SlotAction> {
    if event.state != ElementState::Pressed || event.repeat {
        return None;
    }
    match event.physical_key {
        PhysicalKey::Code(code) => action_from_keycode(code),
        PhysicalKey::Unidentified(_) => None,
    }
}

#[inline(always)]
pub fn is_click(button: MouseButton, state: ElementState) -> bool {
    button == MouseButton::Left && state == ElementState::Pressed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spin_keys() {
        assert_eq!(action_from_keycode(KeyCode::Space), Some(SlotAction::Spin));
        assert_eq!(action_from_keycode(KeyCode::Enter), Some(SlotAction::Spin));
        assert_eq!(action_from_keycode(KeyCode::Escape), Some(SlotAction::Exit));
        assert_eq!(action_from_keycode(KeyCode::KeyQ), None);
    }

    #[test]
    fn only_left_press_clicks() {
        assert!(is_click(MouseButton::Left, ElementState::Pressed));
        assert!(!is_click(MouseButton::Left, ElementState::Released));
        assert!(!is_click(MouseButton::Right, ElementState::Pressed));
    }
}
