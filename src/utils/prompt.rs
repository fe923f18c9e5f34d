//! 终端密码输入
//!
//! stdin 是终端时进入 raw 模式读取，不回显；否则从 stdin 读一行

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use std::io::{self, BufRead, IsTerminal, Write};

/// 提示并读取密码
pub fn read_password(prompt: &str) -> io::Result<String> {
    eprint!("{prompt}");
    io::stderr().flush()?;

    if !io::stdin().is_terminal() {
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        return Ok(line.trim_end_matches(['\n', '\r']).to_string());
    }

    terminal::enable_raw_mode()?;
    let result = read_hidden_line();
    terminal::disable_raw_mode()?;
    eprintln!();
    result
}

fn read_hidden_line() -> io::Result<String> {
    let mut password = String::new();
    loop {
        let Event::Key(KeyEvent {
            code,
            modifiers,
            kind,
            ..
        }) = event::read()?
        else {
            continue;
        };
        if kind == KeyEventKind::Release {
            continue;
        }
        match code {
            KeyCode::Enter => return Ok(password),
            KeyCode::Backspace => {
                password.pop();
            }
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                return Err(io::Error::new(io::ErrorKind::Interrupted, "已取消输入"));
            }
            KeyCode::Char(c) => password.push(c),
            _ => {}
        }
    }
}
