//! Pin and peripheral steps of a sequence, and the peripheral picker that edits them.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StepError {
    #[error("step index {index} out of range for sequence of {len} steps")]
    IndexOutOfRange { index: usize, len: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadPinArgs {
    pub pin_mode: u8,
    pub pin_number: u32,
    pub label: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WritePinArgs {
    pub pin_number: u32,
    pub pin_value: i32,
    pub pin_mode: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadPeripheralArgs {
    pub peripheral_id: i64,
    pub pin_mode: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WritePeripheralArgs {
    pub peripheral_id: i64,
    pub pin_value: i32,
    pub pin_mode: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "args", rename_all = "snake_case")]
pub enum SequenceStep {
    ReadPin(ReadPinArgs),
    WritePin(WritePinArgs),
    ReadPeripheral(ReadPeripheralArgs),
    WritePeripheral(WritePeripheralArgs),
}

impl SequenceStep {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ReadPin(_) => "read_pin",
            Self::WritePin(_) => "write_pin",
            Self::ReadPeripheral(_) => "read_peripheral",
            Self::WritePeripheral(_) => "write_peripheral",
        }
    }
}

pub const EMPTY_READ_PIN: SequenceStep = SequenceStep::ReadPin(ReadPinArgs {
    pin_mode: 0,
    pin_number: 13,
    label: String::new(),
});

pub const EMPTY_READ_PERIPHERAL: SequenceStep = SequenceStep::ReadPeripheral(ReadPeripheralArgs {
    peripheral_id: 0,
    pin_mode: 0,
});

pub const EMPTY_WRITE_PERIPHERAL: SequenceStep =
    SequenceStep::WritePeripheral(WritePeripheralArgs {
        peripheral_id: 0,
        pin_value: 0,
        pin_mode: 0,
    });

pub const EMPTY_WRITE_PIN: SequenceStep = SequenceStep::WritePin(WritePinArgs {
    pin_number: 13,
    pin_value: 0,
    pin_mode: 0,
});

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sequence {
    pub name: String,
    pub body: Vec<SequenceStep>,
}

/// Returns a copy of `sequence` with the step at `index` run through `executor`.
pub fn edit_step(
    sequence: &Sequence,
    index: usize,
    executor: impl FnOnce(&mut SequenceStep),
) -> Result<Sequence, StepError> {
    let mut next = sequence.clone();
    let len = next.body.len();
    let step = next
        .body
        .get_mut(index)
        .ok_or(StepError::IndexOutOfRange { index, len })?;
    executor(step);
    Ok(next)
}

/// Builds an edit that swaps a step for `replacement`, e.g. `read_pin` to `read_peripheral`.
pub fn change_step(
    replacement: SequenceStep,
) -> impl Fn(&Sequence, usize) -> Result<Sequence, StepError> {
    move |sequence: &Sequence, index: usize| {
        edit_step(sequence, index, |step| *step = replacement.clone())
    }
}

/// # Panics
///
/// When `step` is not a peripheral step. Callers only render the peripheral
/// picker for peripheral steps.
pub fn peripheral_id(step: &SequenceStep) -> i64 {
    match step {
        SequenceStep::ReadPeripheral(args) => args.peripheral_id,
        SequenceStep::WritePeripheral(args) => args.peripheral_id,
        other => panic!("{} step has no peripheral_id", other.kind()),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Peripheral {
    pub id: Option<i64>,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DropDownValue {
    Number(i64),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropDownItem {
    pub label: String,
    pub value: DropDownValue,
}

/// Saved peripherals as picker entries. Unsaved ones (no id yet) are left out.
pub fn peripheral_choices(peripherals: &[Peripheral]) -> Vec<DropDownItem> {
    peripherals
        .iter()
        .map(|p| (p.label.clone(), p.id.unwrap_or(0)))
        .filter(|(_, id)| *id != 0)
        .map(|(label, id)| DropDownItem {
            label,
            value: DropDownValue::Number(id),
        })
        .collect()
}

pub fn selected_item(id: i64, peripherals: &[Peripheral]) -> Option<DropDownItem> {
    peripherals
        .iter()
        .find(|p| p.id == Some(id))
        .map(|p| DropDownItem {
            label: p.label.clone(),
            value: DropDownValue::Number(p.id.unwrap_or(0)),
        })
}

/// Points the peripheral step at `index` to the picked peripheral.
///
/// # Panics
///
/// When the selection is not numeric, or the step is not a peripheral step.
pub fn select_peripheral(
    sequence: &Sequence,
    index: usize,
    selection: &DropDownItem,
) -> Result<Sequence, StepError> {
    let &DropDownValue::Number(id) = &selection.value else {
        panic!("selection value must be numeric");
    };

    edit_step(sequence, index, |step| match step {
        SequenceStep::ReadPeripheral(args) => args.peripheral_id = id,
        SequenceStep::WritePeripheral(args) => args.peripheral_id = id,
        other => panic!("{} step has no peripheral_id", other.kind()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn peripherals() -> Vec<Peripheral> {
        vec![
            Peripheral {
                id: Some(7),
                label: "Water".to_string(),
            },
            Peripheral {
                id: None,
                label: "Unsaved".to_string(),
            },
            Peripheral {
                id: Some(9),
                label: "Vacuum".to_string(),
            },
        ]
    }

    fn sequence() -> Sequence {
        Sequence {
            name: "Water plants".to_string(),
            body: vec![EMPTY_READ_PIN, EMPTY_WRITE_PERIPHERAL],
        }
    }

    #[test]
    fn empty_steps_use_pin_13() {
        assert_eq!(
            EMPTY_WRITE_PIN,
            SequenceStep::WritePin(WritePinArgs {
                pin_number: 13,
                pin_value: 0,
                pin_mode: 0
            })
        );
        assert_eq!(peripheral_id(&EMPTY_READ_PERIPHERAL), 0);
    }

    #[test]
    fn steps_use_kind_and_args_on_the_wire() {
        let value = serde_json::to_value(&EMPTY_READ_PERIPHERAL).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "kind": "read_peripheral",
                "args": {"peripheral_id": 0, "pin_mode": 0}
            })
        );
    }

    #[test]
    fn change_step_swaps_kind_without_touching_original() {
        let original = sequence();
        let to_peripheral = change_step(EMPTY_READ_PERIPHERAL);

        let changed = to_peripheral(&original, 0).unwrap();

        assert_eq!(changed.body[0], EMPTY_READ_PERIPHERAL);
        assert_eq!(changed.body[1], original.body[1]);
        assert_eq!(original.body[0], EMPTY_READ_PIN);
    }

    #[test]
    fn edit_step_rejects_bad_index() {
        let err = edit_step(&sequence(), 5, |_| {}).unwrap_err();
        assert_eq!(err, StepError::IndexOutOfRange { index: 5, len: 2 });
    }

    #[test]
    fn peripheral_choices_skip_unsaved() {
        let choices = peripheral_choices(&peripherals());
        let labels: Vec<&str> = choices.iter().map(|c| c.label.as_str()).collect();

        assert_eq!(labels, vec!["Water", "Vacuum"]);
        assert_eq!(choices[1].value, DropDownValue::Number(9));
    }

    #[test]
    fn selected_item_finds_peripheral_by_id() {
        assert_eq!(
            selected_item(9, &peripherals()),
            Some(DropDownItem {
                label: "Vacuum".to_string(),
                value: DropDownValue::Number(9),
            })
        );
        assert_eq!(selected_item(0, &peripherals()), None);
    }

    #[test]
    fn select_peripheral_sets_id() {
        let selection = DropDownItem {
            label: "Water".to_string(),
            value: DropDownValue::Number(7),
        };

        let edited = select_peripheral(&sequence(), 1, &selection).unwrap();

        assert_eq!(peripheral_id(&edited.body[1]), 7);
    }

    #[test]
    #[should_panic(expected = "read_pin step has no peripheral_id")]
    fn peripheral_id_of_pin_step_panics() {
        peripheral_id(&EMPTY_READ_PIN);
    }

    #[test]
    #[should_panic(expected = "selection value must be numeric")]
    fn text_selection_panics() {
        let selection = DropDownItem {
            label: "Water".to_string(),
            value: DropDownValue::Text("water".to_string()),
        };
        let _ = select_peripheral(&sequence(), 1, &selection);
    }
}
