//! Experiment information payloads.

use super::PayloadCodec;
use crate::ebml::Node;
use crate::elements::*;
use crate::error::Result;
use crate::writer::Writer;
use ovtrack_core::{EmptyBuffer, ExperimentInfo, ExperimentInfoHeader, Time};

fn uint_or_default(section: Option<&Node>, id: u64) -> Result<u64> {
    match section.and_then(|s| s.child(id)) {
        Some(node) => node.as_uint(),
        None => Ok(0),
    }
}

fn string_or_default(section: Option<&Node>, id: u64) -> Result<String> {
    match section.and_then(|s| s.child(id)) {
        Some(node) => node.as_string(),
        None => Ok(String::new()),
    }
}

impl PayloadCodec for ExperimentInfo {
    fn write_header(header: &ExperimentInfoHeader, writer: &mut Writer) -> Result<()> {
        writer.open_child(HEADER_EXPERIMENT_INFO);

        writer.open_child(HEADER_EXPERIMENT);
        writer.uint(HEADER_EXPERIMENT_ID, header.experiment_id)?;
        writer.string(HEADER_EXPERIMENT_DATE, &header.experiment_date)?;
        writer.close_child()?;

        writer.open_child(HEADER_SUBJECT);
        writer.uint(HEADER_SUBJECT_ID, header.subject_id)?;
        writer.string(HEADER_SUBJECT_NAME, &header.subject_name)?;
        writer.uint(HEADER_SUBJECT_AGE, header.subject_age)?;
        writer.uint(HEADER_SUBJECT_GENDER, header.subject_gender)?;
        writer.close_child()?;

        writer.open_child(HEADER_CONTEXT);
        writer.uint(HEADER_CONTEXT_LABORATORY_ID, header.laboratory_id)?;
        writer.string(HEADER_CONTEXT_LABORATORY_NAME, &header.laboratory_name)?;
        writer.uint(HEADER_CONTEXT_TECHNICIAN_ID, header.technician_id)?;
        writer.string(HEADER_CONTEXT_TECHNICIAN_NAME, &header.technician_name)?;
        writer.close_child()?;

        writer.close_child()?;
        Ok(())
    }

    fn write_buffer(_buffer: &EmptyBuffer, _offset: Time, _writer: &mut Writer) -> Result<()> {
        Ok(())
    }

    // Every field is optional on input.
    fn read_header(root: &Node) -> Result<ExperimentInfoHeader> {
        let info = root.child(HEADER_EXPERIMENT_INFO);
        let experiment = info.and_then(|n| n.child(HEADER_EXPERIMENT));
        let subject = info.and_then(|n| n.child(HEADER_SUBJECT));
        let context = info.and_then(|n| n.child(HEADER_CONTEXT));

        Ok(ExperimentInfoHeader {
            experiment_id: uint_or_default(experiment, HEADER_EXPERIMENT_ID)?,
            experiment_date: string_or_default(experiment, HEADER_EXPERIMENT_DATE)?,
            subject_id: uint_or_default(subject, HEADER_SUBJECT_ID)?,
            subject_name: string_or_default(subject, HEADER_SUBJECT_NAME)?,
            subject_age: uint_or_default(subject, HEADER_SUBJECT_AGE)?,
            subject_gender: uint_or_default(subject, HEADER_SUBJECT_GENDER)?,
            laboratory_id: uint_or_default(context, HEADER_CONTEXT_LABORATORY_ID)?,
            laboratory_name: string_or_default(context, HEADER_CONTEXT_LABORATORY_NAME)?,
            technician_id: uint_or_default(context, HEADER_CONTEXT_TECHNICIAN_ID)?,
            technician_name: string_or_default(context, HEADER_CONTEXT_TECHNICIAN_NAME)?,
        })
    }

    fn read_buffer(_root: &Node, _header: &ExperimentInfoHeader) -> Result<EmptyBuffer> {
        Ok(EmptyBuffer)
    }
}
