//! Operator input capability.
//!
//! Deadzones, inversion and joystick mapping happen before a value reaches
//! this trait; the core only ever sees pre-normalized values.

/// Value of one logical input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputValue {
    /// Continuous axis in `[-1, 1]`.
    Axis(f64),
    /// Digital button.
    Button(bool),
}

impl InputValue {
    /// Interpret the value as an axis; a pressed button reads `1.0`.
    pub fn as_axis(self) -> f64 {
        match self {
            InputValue::Axis(v) if v.is_finite() => v.clamp(-1.0, 1.0),
            InputValue::Axis(_) => 0.0,
            InputValue::Button(pressed) => {
                if pressed {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }

    /// Interpret the value as a button; an axis counts as pressed past `0.5`.
    pub fn as_button(self) -> bool {
        match self {
            InputValue::Button(pressed) => pressed,
            InputValue::Axis(v) => v > 0.5,
        }
    }
}

/// One named logical input, e.g. `"drive_x"` or `"zero_heading"`.
pub trait Input {
    fn name(&self) -> &str;

    fn get(&self) -> InputValue;
}
