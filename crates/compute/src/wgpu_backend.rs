//! GPU implementation of [`ComputeBackend`] built on [`wgpu`].
//!
//! Compiles each kernel's WGSL once and caches the pipeline by the kernel's
//! source hash. Shader errors are reported with the generated source
//! attached. Initialization fails if no compatible adapter is found.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use wgpu::util::DeviceExt;

use crate::layout::{self, BINDING_COUNT};
use crate::{check_previous, BufferView, ComputeBackend, ComputeError, FrameUniforms, Kernel};

pub struct WgpuBackend {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    bind_group_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    pipelines: Mutex<HashMap<u64, Arc<wgpu::ComputePipeline>>>,
}

impl WgpuBackend {
    /// Creates a backend on the adapter selected by `WGPU_BACKEND` /
    /// `WGPU_ADAPTER_NAME`, or the default high-performance one.
    pub fn new() -> Result<Self, ComputeError> {
        let backends = wgpu::util::backend_bits_from_env().unwrap_or_else(wgpu::Backends::all);
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends,
            ..Default::default()
        });
        let adapter = pollster::block_on(wgpu::util::initialize_adapter_from_env_or_default(
            &instance, None,
        ))
        .ok_or(ComputeError::BackendUnavailable)?;
        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("sdf-device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_defaults(),
            },
            None,
        ))
        .map_err(|_| ComputeError::BackendUnavailable)?;
        tracing::info!(adapter = ?adapter.get_info().name, "created wgpu device");

        let entries: Vec<wgpu::BindGroupLayoutEntry> = (0..BINDING_COUNT)
            .map(|binding| wgpu::BindGroupLayoutEntry {
                binding,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: if layout::is_uniform(binding) {
                        wgpu::BufferBindingType::Uniform
                    } else {
                        wgpu::BufferBindingType::Storage {
                            read_only: layout::is_read_only(binding),
                        }
                    },
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            })
            .collect();
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("integrator bindings"),
            entries: &entries,
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("integrator layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        Ok(Self {
            device: Arc::new(device),
            queue: Arc::new(queue),
            bind_group_layout,
            pipeline_layout,
            pipelines: Mutex::new(HashMap::new()),
        })
    }

    fn pipeline(&self, kernel: &Kernel) -> Result<Arc<wgpu::ComputePipeline>, ComputeError> {
        let mut pipelines = self.pipelines.lock();
        if let Some(pipeline) = pipelines.get(&kernel.hash()) {
            return Ok(Arc::clone(pipeline));
        }

        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("scene kernel"),
                source: wgpu::ShaderSource::Wgsl(kernel.source().into()),
            });
        let pipeline = self
            .device
            .create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some("scene pipeline"),
                layout: Some(&self.pipeline_layout),
                module: &module,
                entry_point: "main",
            });
        if let Some(error) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(ComputeError::ShaderCompilation {
                message: error.to_string(),
                wgsl: kernel.source().to_owned(),
            });
        }

        tracing::debug!(hash = format_args!("{:016x}", kernel.hash()), "built pipeline");
        let pipeline = Arc::new(pipeline);
        pipelines.insert(kernel.hash(), Arc::clone(&pipeline));
        Ok(pipeline)
    }
}

impl ComputeBackend for WgpuBackend {
    fn name(&self) -> &'static str {
        "wgpu"
    }

    fn dispatch(
        &self,
        kernel: &Kernel,
        uniforms: &FrameUniforms,
        previous: &BufferView,
        workgroups: [u32; 3],
    ) -> Result<Vec<u8>, ComputeError> {
        check_previous(uniforms, previous)?;
        let pipeline = self.pipeline(kernel)?;
        let size = previous.data.len() as u64;

        let uniform_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("uniforms"),
                contents: bytemuck::bytes_of(uniforms),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            });
        let previous_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("previous accumulation"),
                contents: &previous.data,
                usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            });
        let accumulated_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("accumulation"),
            size,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        let staging_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("staging"),
            size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("integrator bind group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: layout::UNIFORMS,
                    resource: uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: layout::PREVIOUS,
                    resource: previous_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: layout::ACCUMULATED,
                    resource: accumulated_buffer.as_entire_binding(),
                },
            ],
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
        {
            let mut cpass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("integrator pass"),
                timestamp_writes: None,
            });
            cpass.set_pipeline(&pipeline);
            cpass.set_bind_group(0, &bind_group, &[]);
            cpass.dispatch_workgroups(workgroups[0], workgroups[1], workgroups[2]);
        }
        encoder.copy_buffer_to_buffer(&accumulated_buffer, 0, &staging_buffer, 0, size);
        self.queue.submit(Some(encoder.finish()));

        let slice = staging_buffer.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            // The receiver outlives the poll below.
            let _ = tx.send(result);
        });
        self.device.poll(wgpu::Maintain::Wait);
        rx.recv()
            .map_err(|e| ComputeError::Dispatch(e.to_string()))?
            .map_err(|e| ComputeError::Dispatch(e.to_string()))?;
        let bytes = slice.get_mapped_range().to_vec();
        staging_buffer.unmap();
        Ok(bytes)
    }
}
