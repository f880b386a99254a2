// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Defines the hierarchy of error types for the rendering subsystem.
//!
//! Every creation path of the frame core returns one of these. None of them is
//! recovered inside the core: they are propagated to the process entry point,
//! which reports them and exits.

use crate::renderer::api::{ResourceId, RootSignatureId};
use std::fmt;

/// An error related to the loading or compilation of a shader module.
#[derive(Debug)]
pub enum ShaderError {
    /// The shader source could not be read from disk.
    LoadError {
        /// The path of the file that failed to load.
        path: String,
        /// The underlying I/O error, rendered as text.
        source_error: String,
    },
    /// The shader source failed to compile into a backend module.
    CompilationError {
        /// The label of the shader.
        label: String,
        /// Detailed error messages from the shader compiler.
        details: String,
    },
}

impl fmt::Display for ShaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderError::LoadError { path, source_error } => {
                write!(f, "Failed to load shader from '{path}': {source_error}")
            }
            ShaderError::CompilationError { label, details } => {
                write!(f, "Shader compilation failed for '{label}': {details}")
            }
        }
    }
}

impl std::error::Error for ShaderError {}

/// An error related to root signatures and pipeline state objects.
#[derive(Debug)]
pub enum PipelineError {
    /// The backend rejected a root signature layout.
    InvalidRootSignature {
        /// The label of the root signature.
        label: String,
        /// The reason reported by the backend.
        details: String,
    },
    /// A pipeline was finalized against a root signature unknown to the backend.
    UnknownRootSignature(RootSignatureId),
    /// A pipeline description is missing a field required to finalize it.
    IncompleteDescription {
        /// The label of the pipeline.
        label: String,
        /// The name of the missing field.
        missing: &'static str,
    },
    /// The backend failed to compile the pipeline.
    CompilationFailed {
        /// The label of the pipeline.
        label: String,
        /// The reason reported by the backend.
        details: String,
    },
    /// A shader stage failed to load or compile.
    Shader(ShaderError),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::InvalidRootSignature { label, details } => {
                write!(f, "Invalid root signature '{label}': {details}")
            }
            PipelineError::UnknownRootSignature(id) => {
                write!(f, "Root signature {id:?} is not known to the device")
            }
            PipelineError::IncompleteDescription { label, missing } => {
                write!(f, "Pipeline '{label}' cannot be finalized: missing {missing}")
            }
            PipelineError::CompilationFailed { label, details } => {
                write!(f, "Pipeline '{label}' failed to compile: {details}")
            }
            PipelineError::Shader(e) => write!(f, "Pipeline shader error: {e}"),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PipelineError::Shader(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ShaderError> for PipelineError {
    fn from(e: ShaderError) -> Self {
        PipelineError::Shader(e)
    }
}

/// An error related to GPU resources, descriptor heaps and views.
#[derive(Debug)]
pub enum ResourceError {
    /// The committed resource allocation failed.
    AllocationFailed {
        /// The label of the resource.
        label: String,
        /// The reason reported by the backend.
        details: String,
    },
    /// The resource id does not name a live resource.
    NotFound(ResourceId),
    /// A write went past the end of a buffer.
    OutOfBounds {
        /// The resource that was written.
        resource: ResourceId,
        /// The offset of the write.
        offset: u64,
        /// The length of the write.
        len: u64,
        /// The size of the resource.
        size: u64,
    },
    /// A view description is incompatible with the resource it targets.
    InvalidView(String),
    /// An error from the underlying backend.
    BackendError(String),
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceError::AllocationFailed { label, details } => {
                write!(f, "Failed to create committed resource '{label}': {details}")
            }
            ResourceError::NotFound(id) => write!(f, "Resource {id:?} not found"),
            ResourceError::OutOfBounds {
                resource,
                offset,
                len,
                size,
            } => write!(
                f,
                "Write of {len} bytes at offset {offset} overruns {resource:?} ({size} bytes)"
            ),
            ResourceError::InvalidView(msg) => write!(f, "Invalid resource view: {msg}"),
            ResourceError::BackendError(msg) => write!(f, "Backend resource error: {msg}"),
        }
    }
}

impl std::error::Error for ResourceError {}

/// A high-level error from the frame-rendering core.
#[derive(Debug)]
pub enum RenderError {
    /// Initialization of the graphics backend failed.
    InitializationFailed(String),
    /// A resource operation failed.
    Resource(ResourceError),
    /// A pipeline operation failed.
    Pipeline(PipelineError),
    /// The swap chain is out of date or lost and must be resized.
    SurfaceLost,
    /// Acquiring the next back buffer failed for another reason.
    SurfaceAcquireFailed(String),
    /// Command submission or fence synchronization failed.
    Submission(String),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::InitializationFailed(msg) => {
                write!(f, "Graphics initialization failed: {msg}")
            }
            RenderError::Resource(e) => write!(f, "{e}"),
            RenderError::Pipeline(e) => write!(f, "{e}"),
            RenderError::SurfaceLost => write!(f, "The swap chain surface was lost"),
            RenderError::SurfaceAcquireFailed(msg) => {
                write!(f, "Failed to acquire the next back buffer: {msg}")
            }
            RenderError::Submission(msg) => write!(f, "Command submission failed: {msg}"),
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RenderError::Resource(e) => Some(e),
            RenderError::Pipeline(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ResourceError> for RenderError {
    fn from(e: ResourceError) -> Self {
        RenderError::Resource(e)
    }
}

impl From<PipelineError> for RenderError {
    fn from(e: PipelineError) -> Self {
        RenderError::Pipeline(e)
    }
}

impl From<ShaderError> for RenderError {
    fn from(e: ShaderError) -> Self {
        RenderError::Pipeline(PipelineError::Shader(e))
    }
}
