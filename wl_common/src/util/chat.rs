//! Chat messages. These are most commonly used in the chat box, but also
//! show up in window titles and disconnect screens.
//!
//! A chat message is a list of [`Section`]s. Each section has a text
//! component and some styling options. To add a section to a chat message,
//! use [`Chat::add`], then style the returned section in place:
//!
//! ```rust
//! use wl_common::util::{chat::Color, Chat};
//!
//! let mut msg = Chat::new("Hello! ");
//! msg.add("I am red").color(Color::Red);
//! ```

use serde::ser::{Serialize, SerializeSeq, Serializer};
use serde_derive::Serialize;
use std::fmt;

/// This is a chat message. It has a list of sections, and can be serialized
/// to json.
#[derive(Debug, Clone, PartialEq)]
pub struct Chat {
  /// Can never be empty, as it causes too many bugs/edge cases.
  sections: Vec<Section>,
}

impl Default for Chat {
  fn default() -> Self { Chat::empty() }
}

impl Chat {
  /// Creates a new Chat message. This will contain a single section, with the
  /// given text set. No formatting will be applied.
  pub fn new<M: Into<String>>(msg: M) -> Self {
    Chat { sections: vec![Section { text: msg.into(), ..Default::default() }] }
  }
  /// Creates a new Chat message, with 1 empty section.
  ///
  /// There are numerous problems with having no sections, so the sections
  /// list can never be empty.
  pub fn empty() -> Self { Chat::new("") }

  /// Adds a new chat section, with the given string. The returned reference
  /// is a reference into self, so it must be dropped before adding another
  /// section.
  pub fn add<M: Into<String>>(&mut self, msg: M) -> &mut Section {
    let s = Section { text: msg.into(), ..Default::default() };
    let idx = self.sections.len();
    self.sections.push(s);
    self.sections.get_mut(idx).unwrap()
  }

  /// Generates the json that represents this chat message. This is what goes
  /// into chat and disconnect packets.
  pub fn to_json(&self) -> String { serde_json::to_string(self).unwrap() }

  /// Generates a string for this chat message in plain text (no formatting).
  pub fn to_plain(&self) -> String {
    let mut out = String::new();
    for s in &self.sections {
      out.push_str(&s.text);
    }
    out
  }
}

impl Serialize for Chat {
  fn serialize<S: Serializer>(&self, ser: S) -> Result<S::Ok, S::Error> {
    if self.sections.len() == 1 {
      self.sections[0].serialize(ser)
    } else {
      let mut s = ser.serialize_seq(Some(self.sections.len()))?;
      for sec in &self.sections {
        s.serialize_element(sec)?;
      }
      s.end()
    }
  }
}

/// One styled run of text within a chat message.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Section {
  text:          String,
  #[serde(skip_serializing_if = "Option::is_none")]
  bold:          Option<bool>,
  #[serde(skip_serializing_if = "Option::is_none")]
  italic:        Option<bool>,
  #[serde(skip_serializing_if = "Option::is_none")]
  underlined:    Option<bool>,
  #[serde(skip_serializing_if = "Option::is_none")]
  strikethrough: Option<bool>,
  #[serde(skip_serializing_if = "Option::is_none")]
  obfuscated:    Option<bool>,
  #[serde(skip_serializing_if = "Option::is_none")]
  color:         Option<Color>,
}

macro_rules! add_bool {
  ($name: ident) => {
    pub fn $name(&mut self) -> &mut Self {
      self.$name = Some(true);
      self
    }
  };
}

impl Section {
  add_bool!(bold);
  add_bool!(italic);
  add_bool!(underlined);
  add_bool!(strikethrough);
  add_bool!(obfuscated);
  /// Sets the color of this section.
  pub fn color(&mut self, c: Color) -> &mut Self {
    self.color = Some(c);
    self
  }
}

/// A chat color. The serialized names are the ones the client understands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Color {
  Black,
  DarkBlue,
  DarkGreen,
  DarkAqua,
  DarkRed,
  Purple,
  Gold,
  Gray,
  DarkGray,
  Blue,
  BrightGreen,
  Cyan,
  Red,
  Pink,
  Yellow,
  White,
}

impl Color {
  pub fn to_str(&self) -> &'static str {
    match self {
      Self::Black => "black",
      Self::DarkBlue => "dark_blue",
      Self::DarkGreen => "dark_green",
      Self::DarkAqua => "dark_aqua",
      Self::DarkRed => "dark_red",
      Self::Purple => "dark_purple",
      Self::Gold => "gold",
      Self::Gray => "gray",
      Self::DarkGray => "dark_gray",
      Self::Blue => "blue",
      Self::BrightGreen => "green",
      Self::Cyan => "aqua",
      Self::Red => "red",
      Self::Pink => "light_purple",
      Self::Yellow => "yellow",
      Self::White => "white",
    }
  }
}

impl fmt::Display for Color {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result { write!(f, "{}", self.to_str()) }
}

impl Serialize for Color {
  fn serialize<S: Serializer>(&self, ser: S) -> Result<S::Ok, S::Error> {
    ser.serialize_str(self.to_str())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  #[test]
  fn serialize() {
    let msg = Chat::new("Hello!");
    assert_eq!(msg.to_json(), r#"{"text":"Hello!"}"#);

    let mut msg = Chat::new("Hello! ");
    msg.add("I am another section").color(Color::BrightGreen).italic();
    assert_eq!(
      msg.to_json(),
      r#"[{"text":"Hello! "},{"text":"I am another section","italic":true,"color":"green"}]"#
    );
  }

  #[test]
  fn plain_text() {
    let mut msg = Chat::new("a");
    msg.add("b").bold();
    assert_eq!(msg.to_plain(), "ab");
  }
}
