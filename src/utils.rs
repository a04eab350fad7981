use std::io::{self, Write};

use anyhow::bail;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use rustyline::DefaultEditor;

/// Something that answers a prompt with one line of text.
pub trait Prompt {
    fn read_line(&mut self, prompt: &str) -> anyhow::Result<String>;
    /// Like `read_line`, but the answer is not echoed.
    fn read_secret(&mut self, prompt: &str) -> anyhow::Result<String>;
}

impl Prompt for DefaultEditor {
    fn read_line(&mut self, prompt: &str) -> anyhow::Result<String> {
        Ok(self.readline(prompt)?)
    }

    fn read_secret(&mut self, prompt: &str) -> anyhow::Result<String> {
        read_hidden(prompt)
    }
}

#[derive(Debug, PartialEq, Eq)]
enum SecretInput {
    Pending,
    Done,
    Cancelled,
}

fn apply_secret_key(secret: &mut String, key: KeyEvent) -> SecretInput {
    if key.kind != KeyEventKind::Press {
        return SecretInput::Pending;
    }
    match key.code {
        KeyCode::Enter => SecretInput::Done,
        KeyCode::Esc => SecretInput::Cancelled,
        KeyCode::Char('c' | 'd') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            SecretInput::Cancelled
        }
        KeyCode::Char(c) => {
            secret.push(c);
            SecretInput::Pending
        }
        KeyCode::Backspace => {
            secret.pop();
            SecretInput::Pending
        }
        _ => SecretInput::Pending,
    }
}

fn read_hidden_keys() -> anyhow::Result<String> {
    let mut secret = String::new();
    loop {
        if let Event::Key(key) = event::read()? {
            match apply_secret_key(&mut secret, key) {
                SecretInput::Pending => (),
                SecretInput::Done => return Ok(secret),
                SecretInput::Cancelled => bail!("passphrase entry cancelled"),
            }
        }
    }
}

/// Reads a line in raw mode so nothing typed reaches the screen.
fn read_hidden(prompt: &str) -> anyhow::Result<String> {
    let mut stdout = io::stdout();
    write!(stdout, "{prompt}")?;
    stdout.flush()?;

    enable_raw_mode()?;
    let secret = read_hidden_keys();
    disable_raw_mode()?;
    writeln!(stdout)?;
    secret
}

/// Answers every prompt with an empty line, which accepts each default and
/// ends the alternative name loop straight away.
pub struct AcceptDefaults;

impl Prompt for AcceptDefaults {
    fn read_line(&mut self, _prompt: &str) -> anyhow::Result<String> {
        Ok(String::new())
    }

    fn read_secret(&mut self, _prompt: &str) -> anyhow::Result<String> {
        Ok(String::new())
    }
}

pub fn prompt_question(
    rl: &mut impl Prompt,
    question: &str,
    true_answer: &str,
) -> anyhow::Result<bool> {
    let responce = rl.read_line(question)?;
    Ok(responce.trim().to_lowercase().starts_with(true_answer))
}

pub fn prompt_passphrase(rl: &mut impl Prompt) -> anyhow::Result<String> {
    let passphrase = rl.read_secret("Key passphrase: ")?;
    if passphrase.is_empty() {
        bail!("the private key needs a passphrase");
    }
    let confirmation = rl.read_secret("Repeat passphrase: ")?;
    if passphrase != confirmation {
        bail!("passphrases don't match");
    }
    Ok(passphrase)
}


#[cfg(test)]
mod tests {
    use super::{testing::Scripted, *};

    #[test]
    fn question_accepts_yes() {
        assert!(prompt_question(&mut Scripted::new(["Y"]), "?", "y").unwrap());
        assert!(
            prompt_question(&mut Scripted::new([" yes "]), "?", "y").unwrap()
        );
        assert!(!prompt_question(&mut Scripted::new([""]), "?", "y").unwrap());
        assert!(!prompt_question(&mut Scripted::new(["n"]), "?", "y").unwrap());
    }

    #[test]
    fn defaults_never_agree() {
        assert!(!prompt_question(&mut AcceptDefaults, "?", "y").unwrap());
    }

    #[test]
    fn passphrase_must_be_confirmed() {
        let mut rl = Scripted::new(["hunter2", "hunter2"]);
        assert_eq!(prompt_passphrase(&mut rl).unwrap(), "hunter2");
        assert!(rl.prompts.is_empty());
        assert_eq!(
            rl.secret_prompts,
            vec!["Key passphrase: ", "Repeat passphrase: "]
        );

        let mut rl = Scripted::new(["hunter2", "hunter3"]);
        assert!(prompt_passphrase(&mut rl).is_err());
    }

    #[test]
    fn empty_passphrase_is_refused() {
        let mut rl = Scripted::new([""]);
        assert!(prompt_passphrase(&mut rl).is_err());
        assert_eq!(rl.secret_prompts.len(), 1);
    }

    #[test]
    fn accepting_defaults_rejects_passphrase_prompt() {
        assert!(prompt_passphrase(&mut AcceptDefaults).is_err());
    }

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn hidden_input_collects_until_enter() {
        let mut secret = String::new();
        for c in "pw1x".chars() {
            assert_eq!(apply_secret_key(&mut secret, press(KeyCode::Char(c))), SecretInput::Pending);
        }
        apply_secret_key(&mut secret, press(KeyCode::Backspace));

        assert_eq!(apply_secret_key(&mut secret, press(KeyCode::Enter)), SecretInput::Done);
        assert_eq!(secret, "pw1");
    }

    #[test]
    fn hidden_input_can_be_cancelled() {
        let mut secret = String::new();
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);

        assert_eq!(apply_secret_key(&mut secret, ctrl_c), SecretInput::Cancelled);
        assert_eq!(apply_secret_key(&mut secret, press(KeyCode::Esc)), SecretInput::Cancelled);
        assert!(secret.is_empty());
    }

    #[test]
    fn hidden_input_ignores_key_releases() {
        let mut secret = String::new();
        let release = KeyEvent::new_with_kind(
            KeyCode::Char('a'),
            KeyModifiers::NONE,
            KeyEventKind::Release,
        );

        assert_eq!(apply_secret_key(&mut secret, release), SecretInput::Pending);
        assert!(secret.is_empty());
    }
}
