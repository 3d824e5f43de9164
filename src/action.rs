// Inline-button payloads, decoded once into a typed action.
//
// Wire form is `kind` or `kind:arg` or `kind:arg1:arg2`; Telegram caps it at 64 bytes.

use crate::caption::{CaptionLength, ContentMode, GenderStyle, Language, RefineDirection, Tone};
use std::str::FromStr;
use strum::{AsRefStr, EnumString};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum NavTarget {
    Gender,
    Mode,
    Tone,
    Length,
    Lang,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackAction {
    Gender(GenderStyle),
    /// Asking for adult mode only opens the confirmation step.
    Mode(ContentMode),
    AdultConfirm(bool),
    Tone(Tone),
    Length(CaptionLength),
    Language(Language),
    SuperMode(bool),
    Nav(NavTarget),
    More,
    Pick { batch_id: String, index: usize },
    Refine(RefineDirection),
    SaveFavorite,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ActionDecodeError {
    #[error("unknown action kind: {0}")]
    UnknownKind(String),
    #[error("bad argument for {kind}: {arg:?}")]
    BadArgument { kind: &'static str, arg: String },
}

fn parse_arg<T: FromStr>(kind: &'static str, arg: Option<&str>) -> Result<T, ActionDecodeError> {
    let raw = arg.unwrap_or_default();
    raw.parse().map_err(|_| ActionDecodeError::BadArgument {
        kind,
        arg: raw.to_string(),
    })
}

fn parse_switch(kind: &'static str, arg: Option<&str>, on: &str, off: &str) -> Result<bool, ActionDecodeError> {
    match arg {
        Some(a) if a == on => Ok(true),
        Some(a) if a == off => Ok(false),
        other => Err(ActionDecodeError::BadArgument {
            kind,
            arg: other.unwrap_or_default().to_string(),
        }),
    }
}

impl CallbackAction {
    pub fn encode(&self) -> String {
        match self {
            CallbackAction::Gender(g) => format!("gender:{}", g.as_ref()),
            CallbackAction::Mode(m) => format!("mode:{}", m.as_ref()),
            CallbackAction::AdultConfirm(yes) => format!("adult:{}", if *yes { "yes" } else { "no" }),
            CallbackAction::Tone(t) => format!("tone:{}", t.as_ref()),
            CallbackAction::Length(l) => format!("len:{}", l.as_ref()),
            CallbackAction::Language(l) => format!("lang:{}", l.as_ref()),
            CallbackAction::SuperMode(on) => format!("super:{}", if *on { "on" } else { "off" }),
            CallbackAction::Nav(n) => format!("nav:{}", n.as_ref()),
            CallbackAction::More => "more".to_string(),
            CallbackAction::Pick { batch_id, index } => format!("pick:{batch_id}:{index}"),
            CallbackAction::Refine(d) => format!("refine:{}", d.as_ref()),
            CallbackAction::SaveFavorite => "fav".to_string(),
        }
    }

    pub fn decode(payload: &str) -> Result<Self, ActionDecodeError> {
        let mut parts = payload.splitn(3, ':');
        let kind = parts.next().unwrap_or_default();
        let arg1 = parts.next();
        let arg2 = parts.next();

        let action = match kind {
            "gender" => CallbackAction::Gender(parse_arg("gender", arg1)?),
            "mode" => CallbackAction::Mode(parse_arg("mode", arg1)?),
            "adult" => CallbackAction::AdultConfirm(parse_switch("adult", arg1, "yes", "no")?),
            "tone" => CallbackAction::Tone(parse_arg("tone", arg1)?),
            "len" => CallbackAction::Length(parse_arg("len", arg1)?),
            "lang" => CallbackAction::Language(parse_arg("lang", arg1)?),
            "super" => CallbackAction::SuperMode(parse_switch("super", arg1, "on", "off")?),
            "nav" => CallbackAction::Nav(parse_arg("nav", arg1)?),
            "more" => CallbackAction::More,
            "pick" => {
                let batch_id = arg1
                    .filter(|id| !id.is_empty())
                    .ok_or_else(|| ActionDecodeError::BadArgument {
                        kind: "pick",
                        arg: payload.to_string(),
                    })?
                    .to_string();
                CallbackAction::Pick {
                    batch_id,
                    index: parse_arg("pick", arg2)?,
                }
            }
            "refine" => CallbackAction::Refine(parse_arg("refine", arg1)?),
            "fav" => CallbackAction::SaveFavorite,
            other => return Err(ActionDecodeError::UnknownKind(other.to_string())),
        };
        Ok(action)
    }
}
