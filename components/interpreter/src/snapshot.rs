//! Fiber snapshots: serialize suspended call stacks, restore them later.
//!
//! A snapshot embeds the full chunk of every suspended frame, so a
//! restored fiber resumes against exactly the code it was suspended in,
//! immune to later redefinition of the functions involved. The encoding is
//! self-describing JSON behind an explicit format version.

use crate::call_frame::{CallFrame, TryScope};
use crate::call_stack::CallStack;
use crate::fiber::Fiber;
use bytecode_system::BytecodeChunk;
use core_types::{ScriptError, Value};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::sync::Arc;

/// Snapshot format version; bumped on any incompatible change.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Top-level snapshot payload: one or more fibers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FiberGroupImage {
    /// Format version, checked on restore.
    pub version: u32,
    /// Serialized fibers, in save order.
    pub fibers: Vec<FiberImage>,
}

/// Serialized form of one suspended fiber.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FiberImage {
    /// Resume value not yet injected (normally `None` at a yield point).
    pub pending: Option<Value>,
    /// Frames, bottom first.
    pub frames: Vec<FrameImage>,
}

/// Serialized form of one call frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameImage {
    /// Function name for function frames.
    pub function: Option<String>,
    /// The frame's full chunk, embedded.
    pub chunk: BytecodeChunk,
    /// Resume cursor.
    pub ip: usize,
    /// Frame locals.
    pub locals: HashMap<String, Value>,
    /// Operand stack.
    pub stack: Vec<Value>,
    /// Sticky result register.
    pub result: Value,
    /// Active try scopes, innermost last.
    pub try_scopes: Vec<TryScope>,
}

impl FiberImage {
    /// Capture a suspended fiber's full state.
    pub fn capture(fiber: &Fiber) -> Self {
        Self {
            pending: fiber.pending.clone(),
            frames: fiber
                .call_stack
                .frames()
                .iter()
                .map(FrameImage::capture)
                .collect(),
        }
    }

    /// Rebuild the call stack and pending slot this image describes.
    pub fn into_parts(self) -> (CallStack, Option<Value>) {
        let frames = self.frames.into_iter().map(FrameImage::into_frame).collect();
        (CallStack::from_frames(frames), self.pending)
    }

    fn validate(&self) -> Result<(), ScriptError> {
        for frame in &self.frames {
            frame.validate()?;
        }
        Ok(())
    }
}

impl FrameImage {
    fn capture(frame: &CallFrame) -> Self {
        Self {
            function: frame.function.clone(),
            chunk: (*frame.chunk).clone(),
            ip: frame.ip,
            locals: frame.locals.clone(),
            stack: frame.stack.clone(),
            result: frame.result.clone(),
            try_scopes: frame.try_scopes.clone(),
        }
    }

    fn into_frame(self) -> CallFrame {
        CallFrame {
            chunk: Arc::new(self.chunk),
            function: self.function,
            ip: self.ip,
            locals: self.locals,
            stack: self.stack,
            result: self.result,
            try_scopes: self.try_scopes,
        }
    }

    fn validate(&self) -> Result<(), ScriptError> {
        if self.ip > self.chunk.instructions.len() {
            return Err(ScriptError::Snapshot(
                "frame resume cursor out of range".to_string(),
            ));
        }
        for scope in &self.try_scopes {
            if scope.table as usize >= self.chunk.try_tables.len() {
                return Err(ScriptError::Snapshot(
                    "try scope references a missing try table".to_string(),
                ));
            }
            if scope.stack_height > self.stack.len() {
                return Err(ScriptError::Snapshot(
                    "try scope records an impossible operand-stack height".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Write fiber images to a snapshot file.
pub fn write_to_path<P: AsRef<Path>>(path: P, fibers: Vec<FiberImage>) -> Result<(), ScriptError> {
    let group = FiberGroupImage {
        version: SNAPSHOT_VERSION,
        fibers,
    };
    let file = File::create(path)
        .map_err(|err| ScriptError::Snapshot(format!("cannot write snapshot: {}", err)))?;
    serde_json::to_writer(BufWriter::new(file), &group)
        .map_err(|err| ScriptError::Snapshot(format!("cannot encode snapshot: {}", err)))
}

/// Read and validate fiber images from a snapshot file.
///
/// Fails on IO errors, undecodable payloads, version mismatches, and
/// structurally impossible frames; the caller registers fibers only after
/// this returns, keeping restore all-or-nothing.
pub fn read_from_path<P: AsRef<Path>>(path: P) -> Result<Vec<FiberImage>, ScriptError> {
    let file = File::open(path)
        .map_err(|err| ScriptError::Snapshot(format!("cannot read snapshot: {}", err)))?;
    let group: FiberGroupImage = serde_json::from_reader(BufReader::new(file))
        .map_err(|err| ScriptError::Snapshot(format!("cannot decode snapshot: {}", err)))?;
    if group.version != SNAPSHOT_VERSION {
        return Err(ScriptError::Snapshot(format!(
            "unsupported snapshot version {}",
            group.version
        )));
    }
    for fiber in &group.fibers {
        fiber.validate()?;
    }
    Ok(group.fibers)
}
