use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Context, Error};
use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Identifier for a mouse button (left button is zero).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MouseButton(u8);

impl MouseButton {
    pub const LEFT: Self = Self(0);
    pub const MIDDLE: Self = Self(1);
    pub const RIGHT: Self = Self(2);

    pub fn new(index: u8) -> Self {
        Self(index)
    }

    pub fn index(self) -> u8 {
        self.0
    }

    pub fn is_primary(self) -> bool {
        self == Self::LEFT
    }
}

/// Host-neutral input delivered to a page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum InputEvent {
    /// Pointer click at a screen position (origin top-left, y down).
    Click { position: Vec2, button: MouseButton },
    /// Wheel movement; positive values scroll down.
    Wheel { delta_y: f32 },
    Resize { width: u32, height: u32 },
}

impl InputEvent {
    pub fn click(x: f32, y: f32) -> Self {
        Self::Click {
            position: Vec2::new(x, y),
            button: MouseButton::LEFT,
        }
    }
}

impl fmt::Display for InputEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Click { position, button } if button.is_primary() => {
                write!(f, "click:{},{}", position.x, position.y)
            }
            Self::Click { position, button } => {
                write!(f, "click:{},{}@{}", position.x, position.y, button.index())
            }
            Self::Wheel { delta_y } => write!(f, "wheel:{delta_y}"),
            Self::Resize { width, height } => write!(f, "resize:{width}x{height}"),
        }
    }
}

/// Parses the textual event forms accepted on the command line:
/// `click:X,Y`, `click:X,Y@BUTTON`, `wheel:DY` and `resize:WxH`.
impl FromStr for InputEvent {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let (kind, args) = text
            .split_once(':')
            .ok_or_else(|| anyhow!("event {text:?} is missing a ':'"))?;
        match kind.to_ascii_lowercase().as_str() {
            "click" => {
                let (coords, button) = match args.split_once('@') {
                    Some((coords, button)) => (
                        coords,
                        MouseButton::new(
                            button
                                .parse::<u8>()
                                .with_context(|| format!("invalid mouse button in {text:?}"))?,
                        ),
                    ),
                    None => (args, MouseButton::LEFT),
                };
                let (x, y) = coords
                    .split_once(',')
                    .ok_or_else(|| anyhow!("click {text:?} must look like click:X,Y"))?;
                Ok(Self::Click {
                    position: Vec2::new(parse_coord(x, text)?, parse_coord(y, text)?),
                    button,
                })
            }
            "wheel" => Ok(Self::Wheel {
                delta_y: parse_coord(args, text)?,
            }),
            "resize" => {
                let (width, height) = args
                    .split_once('x')
                    .ok_or_else(|| anyhow!("resize {text:?} must look like resize:WxH"))?;
                Ok(Self::Resize {
                    width: parse_size(width, text)?,
                    height: parse_size(height, text)?,
                })
            }
            other => Err(anyhow!("unknown event kind {other:?}")),
        }
    }
}

fn parse_coord(value: &str, event: &str) -> Result<f32, Error> {
    value
        .trim()
        .parse::<f32>()
        .with_context(|| format!("invalid number {value:?} in {event:?}"))
}

fn parse_size(value: &str, event: &str) -> Result<u32, Error> {
    value
        .trim()
        .parse::<u32>()
        .with_context(|| format!("invalid size {value:?} in {event:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_event_forms() {
        assert_eq!(
            "click:237.5,337.5".parse::<InputEvent>().unwrap(),
            InputEvent::click(237.5, 337.5)
        );
        assert_eq!(
            "click:1,2@2".parse::<InputEvent>().unwrap(),
            InputEvent::Click {
                position: Vec2::new(1.0, 2.0),
                button: MouseButton::RIGHT
            }
        );
        assert_eq!(
            "wheel:-120".parse::<InputEvent>().unwrap(),
            InputEvent::Wheel { delta_y: -120.0 }
        );
        assert_eq!(
            "resize:800x600".parse::<InputEvent>().unwrap(),
            InputEvent::Resize {
                width: 800,
                height: 600
            }
        );
    }

    #[test]
    fn rejects_malformed_events() {
        assert!("click".parse::<InputEvent>().is_err());
        assert!("click:1".parse::<InputEvent>().is_err());
        assert!("wheel:down".parse::<InputEvent>().is_err());
        assert!("tap:1,2".parse::<InputEvent>().is_err());
    }

    #[test]
    fn display_round_trips_through_parse() {
        let event = InputEvent::Resize {
            width: 1600,
            height: 900,
        };
        assert_eq!(event.to_string().parse::<InputEvent>().unwrap(), event);
    }
}
