//! Scripted input tracks.
//!
//! One segment per line: a frame count, the frame time in seconds, then any
//! number of action tokens.
//!
//! ```text
//! # frames  dt      actions
//! 120       0.0069  forward
//! 1         0.0069  forward jump
//! 60        0.016   forward sprint mouse=4,0
//! 1         0.016   focus_lost
//! ```
//!
//! `jump` is a press on the segment's first frame only. `focus_lost` and
//! `respawn` fire once before the segment's first frame.

use anyhow::{Context, Result, anyhow, bail};
use kinematics::FrameInput;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScriptEvent {
    FocusLost,
    Respawn,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Segment {
    pub frames: u32,
    pub dt: f32,
    pub input: FrameInput,
    pub event: Option<ScriptEvent>,
}

/// One displayed frame of a track.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScriptFrame {
    pub dt: f32,
    pub input: FrameInput,
    pub event: Option<ScriptEvent>,
}

fn parse_mouse(value: &str) -> Result<(f32, f32)> {
    let (dx, dy) = value
        .split_once(',')
        .ok_or_else(|| anyhow!("mouse expects `dx,dy`, got `{value}`"))?;
    Ok((dx.trim().parse()?, dy.trim().parse()?))
}

fn parse_segment(tokens: &[&str]) -> Result<Segment> {
    let [frames, dt, actions @ ..] = tokens else {
        bail!("expected `frames dt [actions...]`");
    };
    let frames: u32 = frames.parse().with_context(|| format!("bad frame count `{frames}`"))?;
    let dt: f32 = dt.parse().with_context(|| format!("bad frame time `{dt}`"))?;
    if !(dt.is_finite() && dt >= 0.0) {
        bail!("frame time must be a non-negative number, got {dt}");
    }

    let mut input = FrameInput::default();
    let mut event = None;
    for action in actions {
        match *action {
            "forward" => input.move_z += 1.0,
            "back" => input.move_z -= 1.0,
            "right" => input.move_x += 1.0,
            "left" => input.move_x -= 1.0,
            "turn_left" => input.yaw_axis += 1.0,
            "turn_right" => input.yaw_axis -= 1.0,
            "jump" => input.jump_pressed = true,
            "sprint" => input.sprint_held = true,
            "ui" => input.ui_captures_keyboard = true,
            "focus_lost" => event = Some(ScriptEvent::FocusLost),
            "respawn" => event = Some(ScriptEvent::Respawn),
            other => match other.split_once('=') {
                Some(("mouse", value)) => {
                    (input.mouse_dx, input.mouse_dy) = parse_mouse(value)?;
                }
                _ => bail!("unknown action `{other}`"),
            },
        }
    }
    Ok(Segment {
        frames,
        dt,
        input,
        event,
    })
}

/// Parse a whole track.
pub fn parse_script(text: &str) -> Result<Vec<Segment>> {
    let mut segments = Vec::new();
    for (idx, raw) in text.lines().enumerate() {
        let content = raw.split('#').next().unwrap_or("").trim();
        if content.is_empty() {
            continue;
        }
        let tokens: Vec<&str> = content.split_whitespace().collect();
        let segment = parse_segment(&tokens).with_context(|| format!("script line {}", idx + 1))?;
        segments.push(segment);
    }
    Ok(segments)
}

/// Expand segments into per-frame samples.
pub fn expand(segments: &[Segment]) -> Vec<ScriptFrame> {
    let mut frames = Vec::new();
    for seg in segments {
        for i in 0..seg.frames {
            let mut input = seg.input;
            if i > 0 {
                input.jump_pressed = false;
            }
            frames.push(ScriptFrame {
                dt: seg.dt,
                input,
                event: if i == 0 { seg.event } else { None },
            });
        }
    }
    frames
}

/// Track used when no script is given: walk forward at `fps`, jumping every two seconds.
pub fn default_track(frames: u32, fps: f32) -> Vec<ScriptFrame> {
    let dt = 1.0 / fps.max(1.0);
    let jump_every = (2.0 * fps.max(1.0)) as u32;
    (0..frames)
        .map(|i| ScriptFrame {
            dt,
            input: FrameInput {
                move_z: 1.0,
                jump_pressed: jump_every > 0 && i % jump_every == jump_every - 1,
                ..Default::default()
            },
            event: None,
        })
        .collect()
}
