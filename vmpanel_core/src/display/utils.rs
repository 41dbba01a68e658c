use crate::catalog::VmState;
use human_bytes::human_bytes;
use owo_colors::OwoColorize;

pub fn display_size(size: &u64) -> String {
    let res = human_bytes(*size as f64);
    format!("{}", res)
}

pub fn display_owner(owner: &Option<String>) -> String {
    match owner {
        Some(owner) => format!("{}", owner.blue()),
        None => format!("{}", "free".green()),
    }
}

pub fn display_state(state: &VmState) -> String {
    let res = match state {
        VmState::Running => "running".green().to_string(),
        VmState::Stopped => "stopped".red().to_string(),
    };
    format!("{}", res)
}

pub fn display_optional(value: &Option<String>) -> String {
    match value {
        Some(value) => value.to_owned(),
        None => "".to_owned(),
    }
}
