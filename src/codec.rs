//! Decoding of the fixed-point measurement payloads.
//!
//! Unsigned fields report 0xFFFF and signed fields 0x7FFF when a value is not
//! available; both decode to `None`, never to zero.

use crate::command::Command;
use crate::error::ProtocolError;
use crate::types::{MeasurementFrame, Model};

const UNSIGNED_NA: u16 = 0xffff;
const SIGNED_NA: i16 = 0x7fff;

fn unsigned(raw: u16, scale: f32) -> Option<f32> {
    (raw != UNSIGNED_NA).then(|| f32::from(raw) / scale)
}

fn signed(raw: u16, scale: f32) -> Option<f32> {
    let raw = raw as i16;
    (raw != SIGNED_NA).then(|| f32::from(raw) / scale)
}

/// Decodes the read-measured-values response of `model`.
pub(crate) fn decode_measured_values(
    model: Model,
    words: &[u16],
) -> Result<MeasurementFrame, ProtocolError> {
    if words.len() != Command::ReadMeasuredValues(model).response_words() {
        return Err(ProtocolError::MalformedFrame);
    }

    let mut frame = MeasurementFrame {
        pm1_0: unsigned(words[0], 10.0),
        pm2_5: unsigned(words[1], 10.0),
        pm4_0: unsigned(words[2], 10.0),
        pm10_0: unsigned(words[3], 10.0),
        ..Default::default()
    };

    if model == Model::Sen60 {
        decode_number_concentrations_into(&words[4..9], &mut frame)?;
        return Ok(frame);
    }

    frame.humidity = signed(words[4], 100.0);
    frame.temperature = signed(words[5], 200.0);
    match model {
        Model::Sen63c => {
            frame.co2 = (words[6] != UNSIGNED_NA).then_some(words[6]);
        }
        Model::Sen65 | Model::Sen66 | Model::Sen68 => {
            frame.voc_index = signed(words[6], 10.0);
            frame.nox_index = signed(words[7], 10.0);
        }
        Model::Sen60 => {}
    }
    match model {
        Model::Sen66 => frame.co2 = (words[8] != UNSIGNED_NA).then_some(words[8]),
        Model::Sen68 => frame.hcho = unsigned(words[8], 1.0),
        _ => {}
    }
    Ok(frame)
}

/// Decodes the five number-concentration bins into `frame`.
pub(crate) fn decode_number_concentrations_into(
    words: &[u16],
    frame: &mut MeasurementFrame,
) -> Result<(), ProtocolError> {
    if words.len() != frame.number_concentration.len() {
        return Err(ProtocolError::MalformedFrame);
    }
    for (slot, raw) in frame.number_concentration.iter_mut().zip(words) {
        *slot = unsigned(*raw, 10.0);
    }
    Ok(())
}
