//! Simulated chassis: wires configured modules onto sim hardware and
//! registers the drive and the operator script with a [`Robot`].

use swervekit_drive::{
    DriveHandle, DriveInputs, ModuleHardware, ModuleOutput, SwerveDrive, SwerveHoldAngle,
    SwerveModule,
};
use swervekit_hal::sim::{SimImu, SimInput, SimModuleRig};
use swervekit_hal::{DriveActuator, Input, OffsetEncoder, PidController};
use swervekit_runtime::Robot;
use swervekit_types::Vector2;

use crate::config::Config;
use crate::script::{Operator, SimSticks};

/// Everything the host loop needs to run and observe the simulation.
pub struct SimWorld {
    pub robot: Robot,
    pub drive: DriveHandle,
    rigs: Vec<SimModuleRig>,
    imu: SimImu,
    rotation: SimInput,
    max_yaw_rate_deg: f64,
}

impl SimWorld {
    /// Build a disabled robot from `cfg`, with its clock starting at `now`.
    pub fn build(cfg: &Config, now: f64) -> Result<Self, String> {
        let imu = SimImu::new();
        let horizontal = SimInput::axis("horizontal");
        let vertical = SimInput::axis("vertical");
        let rotation = SimInput::axis("rotation");

        let mut rigs = Vec::with_capacity(cfg.modules.len());
        let mut modules = Vec::with_capacity(cfg.modules.len());
        for m in &cfg.modules {
            let rig = SimModuleRig::new(&m.name, cfg.steer_turn_rate);
            let hardware = ModuleHardware {
                drive: Box::new(rig.drive.clone()),
                steer: Box::new(rig.steer.clone()),
                encoder: OffsetEncoder::new(
                    Box::new(rig.encoder.clone()),
                    m.encoder_offset,
                    m.reversed,
                ),
            };
            let steering = Box::new(PidController::new(cfg.steering).with_output_limits(-1.0, 1.0));
            let position = Vector2::new(m.x, m.y);
            let module = SwerveModule::new(m.name.clone(), position, hardware, steering)
                .map_err(|e| format!("Module '{}': {}", m.name, e))?
                .with_tuning(cfg.tuning);
            modules.push(module);
            rigs.push(rig);
        }

        let drive = SwerveDrive::new(modules, Box::new(imu.clone()))
            .with_mode(cfg.drive_mode)
            .with_imu_offset_degrees(cfg.imu_offset_deg)
            .with_inputs(DriveInputs {
                horizontal: Box::new(horizontal.clone()),
                vertical: Box::new(vertical.clone()),
                rotation: Box::new(rotation.clone()),
            });
        let handle = drive.handle();
        let hold = SwerveHoldAngle::new(handle.clone(), Box::new(PidController::new(cfg.hold)));

        let mut robot = Robot::new(now);
        // The script writes the inputs the drive samples, so it updates first.
        let sticks = SimSticks {
            horizontal,
            vertical,
            rotation: rotation.clone(),
        };
        robot.add_component("operator", Box::new(Operator::new(handle.clone(), hold, sticks)));
        robot.add_component("swerve_drive", Box::new(drive));

        Ok(Self {
            robot,
            drive: handle,
            rigs,
            imu,
            rotation,
            max_yaw_rate_deg: cfg.max_yaw_rate_deg,
        })
    }

    /// Advance the physical model by `dt` seconds.
    pub fn integrate(&self, dt: f64) {
        for rig in &self.rigs {
            rig.integrate(dt);
        }
        let rotation = self.rotation.get().as_axis();
        self.imu.integrate(rotation * self.max_yaw_rate_deg, dt);
    }

    /// Module names paired with their most recent outputs.
    pub fn module_report(&self) -> Vec<(String, ModuleOutput)> {
        let outputs = self.drive.module_outputs();
        self.rigs
            .iter()
            .map(|rig| rig.drive.id().trim_end_matches(".drive").to_string())
            .zip(outputs.into_iter().chain(std::iter::repeat(ModuleOutput::default())))
            .collect()
    }
}
