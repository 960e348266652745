use crate::render::GizmoMode;
use glam::Vec3;
use winit::keyboard::{KeyCode, PhysicalKey};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputAction {
    /// Unit direction on the ground plane, scaled by the nudge step later.
    Nudge(Vec3),
    ResetPosition,
    DeleteSelected,
    DuplicateSelected,
    SetGizmoMode(GizmoMode),
    Quit,
    None,
}

/// Maps a key press to an editor action. Releases never act.
pub fn action_for_key(key: PhysicalKey, pressed: bool) -> InputAction {
    if !pressed {
        return InputAction::None;
    }
    let PhysicalKey::Code(code) = key else {
        return InputAction::None;
    };
    match code {
        KeyCode::ArrowRight => InputAction::Nudge(Vec3::X),
        KeyCode::ArrowLeft => InputAction::Nudge(Vec3::NEG_X),
        KeyCode::ArrowUp => InputAction::Nudge(Vec3::NEG_Z),
        KeyCode::ArrowDown => InputAction::Nudge(Vec3::Z),
        KeyCode::KeyD => InputAction::ResetPosition,
        KeyCode::Delete | KeyCode::Backspace => InputAction::DeleteSelected,
        KeyCode::KeyC => InputAction::DuplicateSelected,
        KeyCode::KeyW => InputAction::SetGizmoMode(GizmoMode::Translate),
        KeyCode::KeyE => InputAction::SetGizmoMode(GizmoMode::Rotate),
        KeyCode::KeyR => InputAction::SetGizmoMode(GizmoMode::Scale),
        KeyCode::Escape => InputAction::Quit,
        _ => InputAction::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> InputAction {
        action_for_key(PhysicalKey::Code(code), true)
    }

    #[test]
    fn arrows_nudge_on_ground_plane() {
        assert_eq!(press(KeyCode::ArrowRight), InputAction::Nudge(Vec3::X));
        assert_eq!(press(KeyCode::ArrowLeft), InputAction::Nudge(Vec3::NEG_X));
        assert_eq!(press(KeyCode::ArrowUp), InputAction::Nudge(Vec3::NEG_Z));
        assert_eq!(press(KeyCode::ArrowDown), InputAction::Nudge(Vec3::Z));
    }

    #[test]
    fn editing_keys() {
        assert_eq!(press(KeyCode::Delete), InputAction::DeleteSelected);
        assert_eq!(press(KeyCode::Backspace), InputAction::DeleteSelected);
        assert_eq!(press(KeyCode::KeyD), InputAction::ResetPosition);
        assert_eq!(
            press(KeyCode::KeyR),
            InputAction::SetGizmoMode(GizmoMode::Scale)
        );
    }

    #[test]
    fn releases_are_ignored() {
        assert_eq!(
            action_for_key(PhysicalKey::Code(KeyCode::Delete), false),
            InputAction::None
        );
    }
}
