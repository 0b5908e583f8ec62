// src/macros.rs
//
// Macro sequence templating. A macro is a reusable text sequence with
// numbered variable placeholders of the form `#{n}` that are resolved to
// their stored values at send time.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::codec::{to_transmit_string, ConversionKind};

/// Matches variable placeholders in a sequence. Only single-digit ids 0-9
/// are placeholders; any other bracketed content is literal text. A macro
/// can therefore hold at most ten distinct variables.
static PLACEHOLDER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"#\{[0-9]\}").unwrap());

// ============================================================================
// Types
// ============================================================================

/// A variable slot inside a macro sequence. `name` is the placeholder id
/// and doubles as the display identity; `min_value`/`max_value` are slider
/// bounds carried through for the UI and never interpreted here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MacroVariable {
    pub name: u8,
    pub kind: ConversionKind,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_value: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_value: Option<i64>,
}

impl MacroVariable {
    /// A fresh variable for a newly allocated slot. New variables always
    /// start with the value "0".
    pub fn new(name: u8, kind: ConversionKind) -> Self {
        MacroVariable {
            name,
            kind,
            value: "0".to_string(),
            min_value: None,
            max_value: None,
        }
    }
}

/// A fixed suffix appended to a macro's resolved sequence at send time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppendSequence {
    pub label: String,
    pub command: String,
}

/// The stock append suffixes offered by the macro dialog.
pub fn append_commands() -> Vec<AppendSequence> {
    vec![
        AppendSequence {
            label: "None".to_string(),
            command: String::new(),
        },
        AppendSequence {
            label: "CR".to_string(),
            command: "\r".to_string(),
        },
        AppendSequence {
            label: "LF".to_string(),
            command: "\n".to_string(),
        },
        AppendSequence {
            label: "CR+LF".to_string(),
            command: "\r\n".to_string(),
        },
        AppendSequence {
            label: "Null".to_string(),
            command: crate::codec::decimal_to_ascii(0),
        },
    ]
}

/// A macro definition: the sequence text, the encoding it is authored in,
/// an optional append suffix and the variable list backing its placeholders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MacroData {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub sequence: String,
    pub sequence_format: ConversionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub append_sequence: Option<AppendSequence>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables: Option<Vec<MacroVariable>>,
}

// ============================================================================
// Placeholder Extraction
// ============================================================================

/// All placeholder ids occurring in the sequence, sorted ascending.
/// Duplicates are retained; the left-to-right document order is not.
pub fn get_vars_as_list(sequence: &str) -> Vec<u8> {
    let mut vars: Vec<u8> = PLACEHOLDER_RE
        .find_iter(sequence)
        .map(|m| m.as_str().as_bytes()[2] - b'0')
        .collect();
    vars.sort_unstable();
    vars
}

/// All placeholder ids occurring in the sequence, sorted ascending,
/// without duplicates.
pub fn get_vars_without_duplicates(sequence: &str) -> Vec<u8> {
    let mut vars = get_vars_as_list(sequence);
    vars.dedup();
    vars
}

// ============================================================================
// Variable Management
// ============================================================================

/// Allocate the next free variable id for the sequence: the first gap in
/// the ascending id list, or one past the highest id. Returns `None` when
/// all ten slots (0-9) are in use.
pub fn create_new_variable(sequence: &str, kind: ConversionKind) -> Option<MacroVariable> {
    let vars = get_vars_without_duplicates(sequence);
    if vars.is_empty() {
        return Some(MacroVariable::new(0, kind));
    }
    for (index, id) in vars.iter().enumerate() {
        if *id != index as u8 {
            return Some(MacroVariable::new(index as u8, kind));
        }
    }
    let last = vars[vars.len() - 1];
    if last < 9 {
        return Some(MacroVariable::new(last + 1, kind));
    }
    None
}

/// Append the variable's placeholder to the end of the sequence. Does not
/// check for duplicates; that is the caller's responsibility.
pub fn add_variable_to_sequence(sequence: &str, variable: &MacroVariable) -> String {
    format!("{}#{{{}}}", sequence, variable.name)
}

/// Remove all occurrences of the variable's placeholder from the sequence.
/// A sequence with no placeholders at all is returned verbatim.
pub fn remove_variable_from_sequence(sequence: &str, variable: &MacroVariable) -> String {
    if get_vars_as_list(sequence).is_empty() {
        return sequence.to_string();
    }
    sequence.replace(&format!("#{{{}}}", variable.name), "")
}

/// Recompute the variable list to exactly match the placeholder ids in the
/// sequence. Existing entries are reused by id, unknown ids get a fresh
/// variable, and ids no longer present are dropped. Idempotent.
pub fn rebalance_vars(
    sequence: &str,
    kind: ConversionKind,
    variables: &[MacroVariable],
) -> Vec<MacroVariable> {
    get_vars_without_duplicates(sequence)
        .into_iter()
        .map(|id| {
            variables
                .iter()
                .find(|v| v.name == id)
                .cloned()
                .unwrap_or_else(|| MacroVariable::new(id, kind))
        })
        .collect()
}

// ============================================================================
// Sequence Resolution
// ============================================================================

/// Resolve a macro's sequence by replacing every placeholder with its
/// variable's stored value, in variable list order. The value is substituted
/// exactly as stored, with no numeric formatting.
pub fn build_sequence(data: Option<&MacroData>) -> String {
    let Some(data) = data else {
        return String::new();
    };
    let mut res = data.sequence.clone();
    if let Some(variables) = &data.variables {
        for variable in variables {
            res = res.replace(&format!("#{{{}}}", variable.name), &variable.value);
        }
    }
    res
}

/// Build the raw character string transmitted for a macro: the resolved
/// sequence converted from its authored encoding, plus the append suffix.
pub fn build_transmit_message(data: &MacroData) -> String {
    let sequence = build_sequence(Some(data));
    let mut message = to_transmit_string(&sequence, data.sequence_format);
    if let Some(append) = &data.append_sequence {
        message.push_str(&append.command);
    }
    message
}

// ============================================================================
// Tauri Commands
// ============================================================================

/// Allocate the next free variable for a sequence. Returns `None` when all
/// ten slots are taken.
#[tauri::command]
pub fn create_new_variable_cmd(sequence: String, kind: ConversionKind) -> Option<MacroVariable> {
    create_new_variable(&sequence, kind)
}

/// Append a variable placeholder to a sequence.
#[tauri::command]
pub fn add_variable_cmd(sequence: String, variable: MacroVariable) -> String {
    add_variable_to_sequence(&sequence, &variable)
}

/// Remove a variable's placeholders from a sequence.
#[tauri::command]
pub fn remove_variable_cmd(sequence: String, variable: MacroVariable) -> String {
    remove_variable_from_sequence(&sequence, &variable)
}

/// Re-sync the variable list with the placeholders in a sequence after a
/// free-text edit.
#[tauri::command]
pub fn rebalance_vars_cmd(
    sequence: String,
    kind: ConversionKind,
    variables: Vec<MacroVariable>,
) -> Vec<MacroVariable> {
    rebalance_vars(&sequence, kind, &variables)
}

/// Resolve a macro to its final sequence text.
#[tauri::command]
pub fn build_sequence_cmd(data: MacroData) -> String {
    build_sequence(Some(&data))
}

/// Resolve a macro to the raw string that would be transmitted.
#[tauri::command]
pub fn build_transmit_message_cmd(data: MacroData) -> String {
    build_transmit_message(&data)
}

/// The stock append suffixes for the macro dialog.
#[tauri::command]
pub fn append_commands_cmd() -> Vec<AppendSequence> {
    append_commands()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec_var(name: u8, value: &str) -> MacroVariable {
        MacroVariable {
            name,
            kind: ConversionKind::Dec,
            value: value.to_string(),
            min_value: None,
            max_value: None,
        }
    }

    fn ascii_macro(sequence: &str, variables: Option<Vec<MacroVariable>>) -> MacroData {
        MacroData {
            name: String::new(),
            description: None,
            sequence: sequence.to_string(),
            sequence_format: ConversionKind::Ascii,
            append_sequence: None,
            variables,
        }
    }

    // ========================================================================
    // Placeholder Extraction Tests
    // ========================================================================

    #[test]
    fn test_empty_sequence_with_no_var() {
        let created = create_new_variable("", ConversionKind::Dec).unwrap();
        assert_eq!(created, dec_var(0, "0"));
        assert_eq!(add_variable_to_sequence("", &created), "#{0}");
        assert_eq!(remove_variable_from_sequence("", &created), "");
        assert_eq!(get_vars_as_list(""), Vec::<u8>::new());
        assert_eq!(build_sequence(Some(&ascii_macro("", None))), "");
    }

    #[test]
    fn test_sequence_with_no_var() {
        let sequence = "1234asdf";
        let created = create_new_variable(sequence, ConversionKind::Dec).unwrap();
        assert_eq!(created, dec_var(0, "0"));
        assert_eq!(add_variable_to_sequence(sequence, &created), "1234asdf#{0}");
        assert_eq!(remove_variable_from_sequence(sequence, &created), sequence);
        assert_eq!(get_vars_as_list(sequence), Vec::<u8>::new());
        assert_eq!(build_sequence(Some(&ascii_macro(sequence, None))), sequence);
    }

    #[test]
    fn test_sequence_with_two_vars_consecutive() {
        let sequence = "1234#{0}#{1}asdf";
        let created = create_new_variable(sequence, ConversionKind::Dec).unwrap();
        assert_eq!(created, dec_var(2, "0"));
        assert_eq!(
            add_variable_to_sequence(sequence, &created),
            "1234#{0}#{1}asdf#{2}"
        );
        assert_eq!(remove_variable_from_sequence(sequence, &created), sequence);
        assert_eq!(
            remove_variable_from_sequence(sequence, &dec_var(1, "0")),
            "1234#{0}asdf"
        );
        assert_eq!(get_vars_without_duplicates(sequence), vec![0, 1]);
        assert_eq!(get_vars_as_list(sequence), vec![0, 1]);

        let data = ascii_macro(sequence, Some(vec![dec_var(0, "56"), dec_var(1, "78")]));
        assert_eq!(build_sequence(Some(&data)), "12345678asdf");
    }

    #[test]
    fn test_sequence_with_incomplete_and_invalid_vars() {
        // None of these are placeholders: multi-char id, missing '#',
        // unterminated brace. They pass through everything untouched.
        let sequence = "1#{234#{0a}{0}#{1asd}f";
        let created = create_new_variable(sequence, ConversionKind::Dec).unwrap();
        assert_eq!(created, dec_var(0, "0"));
        assert_eq!(
            add_variable_to_sequence(sequence, &created),
            format!("{}#{{0}}", sequence)
        );
        assert_eq!(remove_variable_from_sequence(sequence, &created), sequence);
        assert_eq!(get_vars_without_duplicates(sequence), Vec::<u8>::new());
        assert_eq!(get_vars_as_list(sequence), Vec::<u8>::new());

        let data = ascii_macro(sequence, Some(vec![dec_var(0, "56"), dec_var(1, "78")]));
        assert_eq!(build_sequence(Some(&data)), "1#{234#{0a}{0}#{1asd}f");
    }

    #[test]
    fn test_sequence_with_duplicate_var() {
        let sequence = "12#{0}34#{0}asdf";
        let created = create_new_variable(sequence, ConversionKind::Dec).unwrap();
        assert_eq!(created, dec_var(1, "0"));
        assert_eq!(
            remove_variable_from_sequence(sequence, &dec_var(0, "0")),
            "1234asdf"
        );
        assert_eq!(get_vars_without_duplicates(sequence), vec![0]);
        assert_eq!(get_vars_as_list(sequence), vec![0, 0]);

        let data = ascii_macro(sequence, Some(vec![dec_var(0, "99")]));
        assert_eq!(build_sequence(Some(&data)), "12993499asdf");
    }

    #[test]
    fn test_sequence_with_vars_not_in_order() {
        let sequence = "12#{1}56#{0}asdf";
        let created = create_new_variable(sequence, ConversionKind::Dec).unwrap();
        assert_eq!(created, dec_var(2, "0"));
        assert_eq!(
            remove_variable_from_sequence(sequence, &dec_var(1, "0")),
            "1256#{0}asdf"
        );
        assert_eq!(get_vars_without_duplicates(sequence), vec![0, 1]);
        assert_eq!(get_vars_as_list(sequence), vec![0, 1]);

        let data = ascii_macro(sequence, Some(vec![dec_var(0, "78"), dec_var(1, "34")]));
        assert_eq!(build_sequence(Some(&data)), "12345678asdf");
    }

    #[test]
    fn test_sequence_with_duplicate_vars_not_in_order() {
        let sequence = "12#{0}2#{1}3#{1}4#{0}asdf";
        let created = create_new_variable(sequence, ConversionKind::Dec).unwrap();
        assert_eq!(created, dec_var(2, "0"));
        assert_eq!(
            remove_variable_from_sequence(sequence, &dec_var(1, "0")),
            "12#{0}234#{0}asdf"
        );
        assert_eq!(get_vars_without_duplicates(sequence), vec![0, 1]);
        assert_eq!(get_vars_as_list(sequence), vec![0, 0, 1, 1]);

        let data = ascii_macro(sequence, Some(vec![dec_var(0, "11"), dec_var(1, "99")]));
        assert_eq!(build_sequence(Some(&data)), "1211299399411asdf");
    }

    #[test]
    fn test_sequence_with_scattered_vars() {
        let sequence = "12#{0}56#{3}as#{5}df";
        let created = create_new_variable(sequence, ConversionKind::Dec).unwrap();
        assert_eq!(created, dec_var(1, "0"));
        assert_eq!(
            remove_variable_from_sequence(sequence, &dec_var(5, "0")),
            "12#{0}56#{3}asdf"
        );
        assert_eq!(get_vars_without_duplicates(sequence), vec![0, 3, 5]);
        assert_eq!(get_vars_as_list(sequence), vec![0, 3, 5]);

        let data = ascii_macro(
            sequence,
            Some(vec![dec_var(0, "34"), dec_var(3, "78"), dec_var(5, "11")]),
        );
        assert_eq!(build_sequence(Some(&data)), "12345678as11df");
    }

    #[test]
    fn test_remove_unknown_var() {
        let sequence = "12#{0}56#{1}as#{2}df";
        assert_eq!(
            remove_variable_from_sequence(sequence, &dec_var(5, "0")),
            sequence
        );
    }

    #[test]
    fn test_create_variable_fills_gap_at_zero() {
        let created = create_new_variable("12#{1}56#{3}asdf", ConversionKind::Dec).unwrap();
        assert_eq!(created, dec_var(0, "0"));
    }

    #[test]
    fn test_create_variable_no_slot_available() {
        let sequence = "#{0}#{1}#{2}#{3}#{4}#{5}#{6}#{7}#{8}#{9}";
        assert_eq!(create_new_variable(sequence, ConversionKind::Dec), None);
    }

    #[test]
    fn test_build_sequence_for_missing_macro() {
        assert_eq!(build_sequence(None), "");
    }

    // ========================================================================
    // Rebalance Tests
    // ========================================================================

    #[test]
    fn test_rebalance_with_unchanged_sequence() {
        let sequence = "12#{0}56#{1}asdf";
        let variables = vec![dec_var(0, "11"), dec_var(1, "22")];
        assert_eq!(
            rebalance_vars(sequence, ConversionKind::Dec, &variables),
            variables
        );
    }

    #[test]
    fn test_rebalance_with_empty_list() {
        let sequence = "12#{0}56#{1}asdf";
        assert_eq!(
            rebalance_vars(sequence, ConversionKind::Dec, &[]),
            vec![dec_var(0, "0"), dec_var(1, "0")]
        );
    }

    #[test]
    fn test_rebalance_with_empty_list_starting_at_two() {
        let sequence = "12#{2}56#{3}asdf";
        assert_eq!(
            rebalance_vars(sequence, ConversionKind::Dec, &[]),
            vec![dec_var(2, "0"), dec_var(3, "0")]
        );
    }

    #[test]
    fn test_rebalance_with_empty_list_and_unordered_sequence() {
        let sequence = "12#{0}56#{3}as#{1}df";
        assert_eq!(
            rebalance_vars(sequence, ConversionKind::Dec, &[]),
            vec![dec_var(0, "0"), dec_var(1, "0"), dec_var(3, "0")]
        );
    }

    #[test]
    fn test_rebalance_keeps_values_and_adds_missing_var() {
        let sequence = "12#{0}56#{2}as#{3}df";
        let variables = vec![dec_var(0, "10"), dec_var(2, "20")];
        assert_eq!(
            rebalance_vars(sequence, ConversionKind::Dec, &variables),
            vec![dec_var(0, "10"), dec_var(2, "20"), dec_var(3, "0")]
        );
    }

    #[test]
    fn test_rebalance_drops_vars_deleted_from_sequence() {
        let sequence = "1256asdf";
        let variables = vec![dec_var(0, "0"), dec_var(2, "0"), dec_var(3, "0")];
        assert_eq!(
            rebalance_vars(sequence, ConversionKind::Dec, &variables),
            Vec::<MacroVariable>::new()
        );
    }

    #[test]
    fn test_rebalance_is_idempotent() {
        let sequence = "12#{1}56#{4}asdf";
        let variables = vec![dec_var(1, "42")];
        let once = rebalance_vars(sequence, ConversionKind::Dec, &variables);
        let twice = rebalance_vars(sequence, ConversionKind::Dec, &once);
        assert_eq!(once, twice);
    }

    // ========================================================================
    // Transmit Message Tests
    // ========================================================================

    #[test]
    fn test_append_commands_null_is_nul_byte() {
        let commands = append_commands();
        assert_eq!(commands.len(), 5);
        assert_eq!(commands[0].command, "");
        assert_eq!(commands[3].command, "\r\n");
        assert_eq!(commands[4].command, "\0");
    }

    #[test]
    fn test_build_transmit_message_ascii_with_append() {
        let mut data = ascii_macro("AT#{0}", Some(vec![dec_var(0, "Z")]));
        data.append_sequence = Some(AppendSequence {
            label: "CR+LF".to_string(),
            command: "\r\n".to_string(),
        });
        assert_eq!(build_transmit_message(&data), "ATZ\r\n");
    }

    #[test]
    fn test_build_transmit_message_converts_sequence_format() {
        let mut data = ascii_macro("41", None);
        data.sequence_format = ConversionKind::Hex;
        assert_eq!(build_transmit_message(&data), "A");

        let mut data = ascii_macro("65", None);
        data.sequence_format = ConversionKind::Dec;
        assert_eq!(build_transmit_message(&data), "A");
    }
}
