//! Stimulation payloads.

use super::PayloadCodec;
use crate::ebml::Node;
use crate::elements::*;
use crate::error::{EbmlError, Result};
use crate::writer::Writer;
use ovtrack_core::{Stimulation, StimulationBuffer, StimulationHeader, StimulationSet, Stimulations, Time};

impl PayloadCodec for Stimulations {
    const EMPTY_MARKERS: bool = true;

    fn write_header(_header: &StimulationHeader, _writer: &mut Writer) -> Result<()> {
        Ok(())
    }

    /// Dates are written shifted by `offset`; durations are relative and
    /// stay as they are.
    fn write_buffer(buffer: &StimulationBuffer, offset: Time, writer: &mut Writer) -> Result<()> {
        writer.open_child(BUFFER_STIMULATION);
        writer.uint(BUFFER_STIMULATION_COUNT, buffer.stimulations.len() as u64)?;
        for stimulation in &buffer.stimulations {
            writer.open_child(BUFFER_STIMULATION_ENTRY);
            writer.uint(BUFFER_STIMULATION_ID, stimulation.identifier)?;
            writer.uint(BUFFER_STIMULATION_DATE, (stimulation.date + offset).raw())?;
            writer.uint(BUFFER_STIMULATION_DURATION, stimulation.duration.raw())?;
            writer.close_child()?;
        }
        writer.close_child()?;
        Ok(())
    }

    fn read_header(_root: &Node) -> Result<StimulationHeader> {
        Ok(StimulationHeader)
    }

    fn read_buffer(root: &Node, _header: &StimulationHeader) -> Result<StimulationBuffer> {
        let section = root.require(BUFFER_STIMULATION, "Stimulation buffer")?;
        let declared = section.require(BUFFER_STIMULATION_COUNT, "StimulationCount")?.as_uint()?;

        let mut stimulations = StimulationSet::new();
        for entry in section.children_with(BUFFER_STIMULATION_ENTRY) {
            let identifier = entry.require(BUFFER_STIMULATION_ID, "StimulationId")?.as_uint()?;
            let date = entry.require(BUFFER_STIMULATION_DATE, "StimulationDate")?.as_uint()?;
            let duration = match entry.child(BUFFER_STIMULATION_DURATION) {
                Some(node) => node.as_uint()?,
                None => 0,
            };
            stimulations.push(Stimulation::new(identifier, Time::from_raw(date), Time::from_raw(duration)));
        }

        if stimulations.len() as u64 != declared {
            return Err(EbmlError::InvalidPayload(format!(
                "stimulation buffer declares {} entries, {} present",
                declared,
                stimulations.len()
            )));
        }
        Ok(StimulationBuffer { stimulations })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(buffer: &StimulationBuffer, offset: Time) -> Node {
        let mut writer = Writer::new();
        writer.open_child(PAYLOAD_BUFFER);
        Stimulations::write_buffer(buffer, offset, &mut writer).unwrap();
        writer.close_child().unwrap();
        Node::parse_all(&writer.finish().unwrap()).unwrap().remove(0)
    }

    fn sample() -> StimulationBuffer {
        StimulationBuffer {
            stimulations: [
                Stimulation::new(0x8100, Time::from_millis(250), Time::ZERO),
                Stimulation::new(0x8101, Time::from_millis(750), Time::from_millis(100)),
            ]
            .into_iter()
            .collect(),
        }
    }

    #[test]
    fn test_offset_moves_dates_only() {
        let root = encode(&sample(), Time::from_secs(2));
        let decoded = Stimulations::read_buffer(&root, &StimulationHeader).unwrap();
        let second = decoded.stimulations.get(1).copied().unwrap();
        assert_eq!(second.identifier, 0x8101);
        assert_eq!(second.date, Time::from_millis(2750));
        assert_eq!(second.duration, Time::from_millis(100));
    }

    #[test]
    fn test_empty_set() {
        let root = encode(&StimulationBuffer::default(), Time::ZERO);
        let decoded = Stimulations::read_buffer(&root, &StimulationHeader).unwrap();
        assert!(decoded.stimulations.is_empty());
    }

    #[test]
    fn test_count_mismatch() {
        let mut writer = Writer::new();
        writer.open_child(PAYLOAD_BUFFER);
        writer.open_child(BUFFER_STIMULATION);
        writer.uint(BUFFER_STIMULATION_COUNT, 3).unwrap();
        writer.close_child().unwrap();
        writer.close_child().unwrap();
        let root = Node::parse_all(&writer.finish().unwrap()).unwrap().remove(0);
        assert!(matches!(
            Stimulations::read_buffer(&root, &StimulationHeader),
            Err(EbmlError::InvalidPayload(_))
        ));
    }
}
