//! Morse encoding of the beeper message
//!
//! Timing in ticks of [`TICK`]:
//!
//! | element | ticks |
//! |---------|-------|
//! | dit | 2 |
//! | dah | 5 |
//! | gap after each element | 2 |
//! | silence before each character | 5 |
//! | word space | 8 |
//!
//! Letters are case-insensitive. Characters without a code are skipped.

use crate::core::driver::Tone;
use std::time::Duration;

/// Length of one tick
pub const TICK: Duration = Duration::from_millis(50);

const DIT_TICKS: u32 = 2;
const DAH_TICKS: u32 = 5;
const ELEMENT_GAP_TICKS: u32 = 2;
const CHAR_GAP_TICKS: u32 = 5;
const WORD_SPACE_TICKS: u32 = 8;

const LETTERS: [&str; 26] = [
    ".-", "-...", "-.-.", "-..", ".", "..-.", "--.", "....", "..", ".---", "-.-", ".-..", "--",
    "-.", "---", ".--.", "--.-", ".-.", "...", "-", "..-", "...-", ".--", "-..-", "-.--", "--..",
];

const DIGITS: [&str; 10] = [
    "-----", ".----", "..---", "...--", "....-", ".....", "-....", "--...", "---..", "----.",
];

/// Dot/dash code for one character
pub fn code(ch: char) -> Option<&'static str> {
    match ch {
        'a'..='z' => Some(LETTERS[(ch as u8 - b'a') as usize]),
        'A'..='Z' => Some(LETTERS[(ch as u8 - b'A') as usize]),
        '0'..='9' => Some(DIGITS[(ch as u8 - b'0') as usize]),
        _ => None,
    }
}

/// Beeper pattern for `message`
pub fn encode(message: &str) -> Vec<Tone> {
    let mut pattern = Vec::new();

    for ch in message.chars() {
        if ch == ' ' {
            pattern.push(silence(WORD_SPACE_TICKS));
            continue;
        }
        let Some(code) = code(ch) else {
            log::debug!("No Morse code for {:?}, skipped", ch);
            continue;
        };

        pattern.push(silence(CHAR_GAP_TICKS));
        for element in code.chars() {
            let ticks = if element == '.' { DIT_TICKS } else { DAH_TICKS };
            pattern.push(Tone { on: true, ticks });
            pattern.push(silence(ELEMENT_GAP_TICKS));
        }
    }

    pattern
}

/// Total playing time of a pattern
pub fn duration(pattern: &[Tone]) -> Duration {
    TICK * pattern.iter().map(|t| t.ticks).sum::<u32>()
}

fn silence(ticks: u32) -> Tone {
    Tone { on: false, ticks }
}
