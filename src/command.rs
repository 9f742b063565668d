use crate::types::{Family, Model};

/// Commands understood by the SEN6x family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Command {
    StartContinuousMeasurement,
    StopMeasurement,
    GetDataReady,
    /// Layout and opcode differ per model.
    ReadMeasuredValues(Model),
    ReadNumberConcentration,
    ReadDeviceStatus,
    ReadAndClearDeviceStatus,
    DeviceReset,
    StartFanCleaning,
    VocAlgorithmTuning,
    NoxAlgorithmTuning,
    VocBaseline,
    TemperatureCompensation,
    ProductName,
    SerialNumber,
}

impl Command {
    /// Opcode and the execution time in ms to wait before the next bus access.
    pub(crate) fn as_tuple(self, family: Family) -> (u16, u32) {
        match (self, family) {
            (Command::StartContinuousMeasurement, Family::Sen60) => (0x2152, 1),
            (Command::StartContinuousMeasurement, Family::Sen6x) => (0x0021, 50),
            (Command::StopMeasurement, Family::Sen60) => (0x3f86, 1000),
            (Command::StopMeasurement, Family::Sen6x) => (0x0104, 1000),
            (Command::GetDataReady, Family::Sen60) => (0xe4b8, 1),
            (Command::GetDataReady, Family::Sen6x) => (0x0202, 20),
            (Command::ReadMeasuredValues(model), _) => match model {
                Model::Sen60 => (0xec05, 1),
                Model::Sen63c => (0x0471, 20),
                Model::Sen65 => (0x0446, 20),
                Model::Sen66 => (0x0300, 20),
                Model::Sen68 => (0x0467, 20),
            },
            (Command::ReadNumberConcentration, _) => (0x0316, 20),
            (Command::ReadDeviceStatus, _) => (0xd206, 20),
            (Command::ReadAndClearDeviceStatus, _) => (0xd210, 20),
            (Command::DeviceReset, Family::Sen60) => (0x3f8d, 1),
            (Command::DeviceReset, Family::Sen6x) => (0xd304, 1200),
            (Command::StartFanCleaning, Family::Sen60) => (0x3730, 1),
            (Command::StartFanCleaning, Family::Sen6x) => (0x5607, 20),
            (Command::VocAlgorithmTuning, _) => (0x60d0, 20),
            (Command::NoxAlgorithmTuning, _) => (0x60e1, 20),
            (Command::VocBaseline, _) => (0x6181, 20),
            (Command::TemperatureCompensation, _) => (0x60b2, 20),
            (Command::ProductName, _) => (0xd014, 20),
            (Command::SerialNumber, _) => (0xd033, 20),
        }
    }

    /// Number of words the device answers with; 0 for write-only commands.
    pub(crate) fn response_words(self) -> usize {
        match self {
            Command::StartContinuousMeasurement
            | Command::StopMeasurement
            | Command::DeviceReset
            | Command::StartFanCleaning
            | Command::TemperatureCompensation => 0,
            Command::GetDataReady | Command::VocBaseline => 1,
            Command::ReadDeviceStatus | Command::ReadAndClearDeviceStatus => 2,
            Command::ReadNumberConcentration => 5,
            Command::VocAlgorithmTuning | Command::NoxAlgorithmTuning => 6,
            Command::ReadMeasuredValues(model) => match model {
                Model::Sen63c => 7,
                Model::Sen65 => 8,
                Model::Sen60 | Model::Sen66 | Model::Sen68 => 9,
            },
            Command::ProductName | Command::SerialNumber => 16,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sen60_has_its_own_opcodes() {
        assert_eq!(
            Command::StartContinuousMeasurement.as_tuple(Family::Sen60).0,
            0x2152
        );
        assert_eq!(
            Command::StartContinuousMeasurement.as_tuple(Family::Sen6x).0,
            0x0021
        );
        assert_eq!(Command::ProductName.as_tuple(Family::Sen60).0, 0xd014);
    }

    #[test]
    fn measured_values_follow_the_model() {
        let cases = [
            (Model::Sen60, 0xec05, 9),
            (Model::Sen63c, 0x0471, 7),
            (Model::Sen65, 0x0446, 8),
            (Model::Sen66, 0x0300, 9),
            (Model::Sen68, 0x0467, 9),
        ];
        for (model, opcode, words) in cases {
            let command = Command::ReadMeasuredValues(model);
            assert_eq!(command.as_tuple(model.family()).0, opcode);
            assert_eq!(command.response_words(), words);
        }
    }
}
