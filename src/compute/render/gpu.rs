//! GPU rasterizer - wgpu compute pass, one invocation per pixel.
//!
//! Every call uploads the triangle list, dispatches the pass, copies the
//! result to a staging buffer and blocks until it is mapped, so a frame
//! returned from `render_into` is always complete.

use super::{RenderError, Renderer};
use crate::compute::Frame;
use crate::schema::Triangle;

const RASTERIZE_SHADER: &str = include_str!("shaders/rasterize.wgsl");

/// Floats per triangle in the storage buffer.
const TRIANGLE_STRIDE: usize = 10;

/// Error type for GPU operations.
#[derive(Debug, thiserror::Error)]
pub enum GpuError {
    #[error("No suitable GPU adapter found")]
    NoAdapter,

    #[error("Failed to request GPU device: {0}")]
    DeviceRequest(#[from] wgpu::RequestDeviceError),

    #[error("Buffer mapping failed: {0}")]
    BufferMap(#[from] wgpu::BufferAsyncError),

    #[error("Buffer mapping callback dropped")]
    MapCallbackDropped,
}

/// Uniform buffer struct for the rasterize shader.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct RasterParams {
    width: u32,
    height: u32,
    count: u32,
    background: u32,
}

/// Output and staging buffers sized for one frame size.
struct FrameBuffers {
    width: u32,
    height: u32,
    output: wgpu::Buffer,
    staging: wgpu::Buffer,
}

/// GPU-backed triangle rasterizer.
pub struct GpuRenderer {
    device: wgpu::Device,
    queue: wgpu::Queue,
    pipeline: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    params_buffer: wgpu::Buffer,
    triangle_buffer: wgpu::Buffer,
    triangle_capacity: usize,
    frame_buffers: Option<FrameBuffers>,
    background: [u8; 4],
}

impl GpuRenderer {
    /// Create a new GPU renderer clearing to `background`.
    pub async fn new(background: [u8; 4]) -> Result<Self, GpuError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|_| GpuError::NoAdapter)?;

        let (device, queue): (wgpu::Device, wgpu::Queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Triangle Rasterizer GPU"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                ..Default::default()
            })
            .await?;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Rasterize Shader"),
            source: wgpu::ShaderSource::Wgsl(RASTERIZE_SHADER.into()),
        });

        let bind_group_layout = create_raster_bind_group_layout(&device);

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Rasterize Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            ..Default::default()
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("Rasterize Pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: Some("main"),
            compilation_options: Default::default(),
            cache: None,
        });

        let params_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Raster Params"),
            size: std::mem::size_of::<RasterParams>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let triangle_capacity = 64;
        let triangle_buffer = create_triangle_buffer(&device, triangle_capacity);

        log::info!("GPU rasterizer ready on {:?}", adapter.get_info().name);

        Ok(Self {
            device,
            queue,
            pipeline,
            bind_group_layout,
            params_buffer,
            triangle_buffer,
            triangle_capacity,
            frame_buffers: None,
            background,
        })
    }

    /// Grow the triangle buffer and resize the frame buffers as needed.
    fn prepare(&mut self, triangle_count: usize, width: u32, height: u32) {
        if triangle_count > self.triangle_capacity {
            self.triangle_capacity = triangle_count.next_power_of_two();
            self.triangle_buffer = create_triangle_buffer(&self.device, self.triangle_capacity);
        }

        let stale = match &self.frame_buffers {
            Some(fb) => fb.width != width || fb.height != height,
            None => true,
        };
        if stale {
            let size = width as u64 * height as u64 * 4;
            let output = self.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("Raster Output Buffer"),
                size,
                usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
                mapped_at_creation: false,
            });
            let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("Raster Staging Buffer"),
                size,
                usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            self.frame_buffers = Some(FrameBuffers {
                width,
                height,
                output,
                staging,
            });
        }
    }

    /// Block until the staging buffer is mapped, then copy it into `frame`.
    fn read_back(&self, staging: &wgpu::Buffer, frame: &mut Frame) -> Result<(), GpuError> {
        let buffer_slice = staging.slice(..);

        let (tx, rx) = std::sync::mpsc::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });

        self.device.poll(wgpu::PollType::wait_indefinitely()).ok();
        rx.recv().map_err(|_| GpuError::MapCallbackDropped)??;

        {
            let data = buffer_slice.get_mapped_range();
            frame.pixels_mut().copy_from_slice(&data);
        }

        staging.unmap();
        Ok(())
    }
}

impl Renderer for GpuRenderer {
    fn render_into(
        &mut self,
        triangles: &[Triangle],
        frame: &mut Frame,
    ) -> Result<(), RenderError> {
        let (width, height) = frame.dimensions();
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.prepare(triangles.len(), width, height);

        let params = RasterParams {
            width,
            height,
            count: triangles.len() as u32,
            background: u32::from_le_bytes(self.background),
        };
        self.queue
            .write_buffer(&self.params_buffer, 0, bytemuck::bytes_of(&params));

        if !triangles.is_empty() {
            let data: Vec<f32> = triangles
                .iter()
                .flat_map(|t| {
                    let [a, b, c] = t.vertices;
                    [
                        a.x, a.y, b.x, b.y, c.x, c.y, t.color[0], t.color[1], t.color[2],
                        t.color[3],
                    ]
                })
                .collect();
            self.queue
                .write_buffer(&self.triangle_buffer, 0, bytemuck::cast_slice(&data));
        }

        let Some(fb) = self.frame_buffers.as_ref() else {
            return Err(RenderError::Backend("frame buffers missing".to_string()));
        };

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Rasterize Bind Group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.params_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: self.triangle_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: fb.output.as_entire_binding(),
                },
            ],
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Rasterize Encoder"),
            });

        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Rasterize Pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.dispatch_workgroups(width.div_ceil(16), height.div_ceil(16), 1);
        }

        let size = width as u64 * height as u64 * 4;
        encoder.copy_buffer_to_buffer(&fb.output, 0, &fb.staging, 0, size);
        self.queue.submit(std::iter::once(encoder.finish()));

        self.read_back(&fb.staging, frame)?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "gpu"
    }
}

fn create_triangle_buffer(device: &wgpu::Device, capacity: usize) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Triangle Buffer"),
        size: (capacity.max(1) * TRIANGLE_STRIDE * std::mem::size_of::<f32>()) as u64,
        usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn create_raster_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("Rasterize Bind Group Layout"),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Storage { read_only: true },
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 2,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Storage { read_only: false },
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
        ],
    })
}
