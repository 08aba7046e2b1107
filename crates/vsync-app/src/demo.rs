//! CT / PET / fusion reading layout
//! Builds the viewport grid and replays a short reading session against it

use std::sync::Arc;

use anyhow::Result;
use glam::DVec3;
use tracing::info;

use vsync_core::{
    init_camera_sync, CameraSnapshot, Colormap, RenderingLayer, SynchronizerRegistry, ViewportRef, VoiRange,
    VoiSnapshot, VolumeId,
};
use vsync_render::HeadlessRenderer;

pub const RENDERING_ENGINE_ID: &str = "myRenderingEngine";
pub const CT_VOLUME_ID: &str = "cornerstoneStreamingImageVolume:CT_VOLUME_ID";
pub const PT_VOLUME_ID: &str = "cornerstoneStreamingImageVolume:PT_VOLUME_ID";
pub const PET_MIP_CORONAL: &str = "PET_MIP_CORONAL";

/// Anatomical plane of a viewport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Plane {
    Axial,
    Sagittal,
    Coronal,
}

impl Plane {
    pub const ALL: [Plane; 3] = [Plane::Axial, Plane::Sagittal, Plane::Coronal];

    pub fn label(&self) -> &'static str {
        match self {
            Plane::Axial => "AXIAL",
            Plane::Sagittal => "SAGITTAL",
            Plane::Coronal => "CORONAL",
        }
    }

    fn camera(&self, parallel_scale: f64) -> CameraSnapshot {
        let (normal, view_up) = match self {
            Plane::Axial => (DVec3::Z, DVec3::NEG_Y),
            Plane::Sagittal => (DVec3::X, DVec3::Z),
            Plane::Coronal => (DVec3::NEG_Y, DVec3::Z),
        };
        CameraSnapshot::looking_at(DVec3::ZERO, normal, view_up, 500.0, parallel_scale)
    }
}

/// Row of the reading grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modality {
    Ct,
    Pt,
    Fusion,
}

impl Modality {
    pub fn viewport(&self, plane: Plane) -> ViewportRef {
        let row = match self {
            Modality::Ct => "CT",
            Modality::Pt => "PT",
            Modality::Fusion => "FUSION",
        };
        ViewportRef::new(RENDERING_ENGINE_ID, format!("{}_{}", row, plane.label()))
    }

    // Volumes differ in extent, so each row starts at its own zoom level
    fn initial_scale(&self) -> f64 {
        match self {
            Modality::Ct => 250.0,
            Modality::Pt => 320.0,
            Modality::Fusion => 280.0,
        }
    }
}

fn ct_display() -> VoiSnapshot {
    VoiSnapshot::new(VoiRange::from_window(400.0, 40.0))
}

fn pt_display(opacity: f64) -> VoiSnapshot {
    VoiSnapshot::new(VoiRange::new(0.0, 5.0)).with_colormap(Colormap::new("hsv", opacity))
}

/// Create the nine grid viewports plus the PET MIP
pub fn build_viewports() -> Arc<HeadlessRenderer> {
    let renderer = Arc::new(HeadlessRenderer::new());
    let ct = VolumeId::from(CT_VOLUME_ID);
    let pt = VolumeId::from(PT_VOLUME_ID);

    for plane in Plane::ALL {
        renderer.add_viewport(
            Modality::Ct.viewport(plane),
            plane.camera(Modality::Ct.initial_scale()),
            [(ct.clone(), ct_display())],
        );
        renderer.add_viewport(
            Modality::Pt.viewport(plane),
            plane.camera(Modality::Pt.initial_scale()),
            [(pt.clone(), pt_display(1.0))],
        );
        // the PET layer of the fusion starts fully transparent
        renderer.add_viewport(
            Modality::Fusion.viewport(plane),
            plane.camera(Modality::Fusion.initial_scale()),
            [(ct.clone(), ct_display()), (pt.clone(), pt_display(0.0))],
        );
    }

    let mut mip = pt_display(1.0);
    mip.invert = true;
    renderer.add_viewport(
        ViewportRef::new(RENDERING_ENGINE_ID, PET_MIP_CORONAL),
        Plane::Coronal.camera(400.0),
        [(pt, mip)],
    );

    info!("Created {} viewports", renderer.viewport_refs().len());
    renderer
}

/// Copy each fusion camera onto its CT and PT counterparts before interaction
pub fn initialize_camera_sync(renderer: &HeadlessRenderer) -> Result<()> {
    for plane in Plane::ALL {
        let fusion = Modality::Fusion.viewport(plane);
        init_camera_sync(renderer, &fusion, &Modality::Ct.viewport(plane))?;
        init_camera_sync(renderer, &fusion, &Modality::Pt.viewport(plane))?;
    }
    Ok(())
}

/// Fusion opacity slider: writes the PET layer of every fusion viewport
pub fn set_fusion_opacity(renderer: &HeadlessRenderer, opacity: f64) -> Result<()> {
    let pt = VolumeId::from(PT_VOLUME_ID);
    for plane in Plane::ALL {
        let fusion = Modality::Fusion.viewport(plane);
        renderer.set_opacity(&fusion, &pt, opacity)?;
        renderer.request_render(&fusion);
    }
    Ok(())
}

/// Scripted interactions standing in for mouse bindings
pub fn run_session(renderer: &HeadlessRenderer, registry: &SynchronizerRegistry) -> Result<()> {
    let ct = VolumeId::from(CT_VOLUME_ID);
    let pt = VolumeId::from(PT_VOLUME_ID);
    let fusion_axial = Modality::Fusion.viewport(Plane::Axial);

    info!("Zooming {}", fusion_axial);
    let camera = renderer.zoom(&fusion_axial, 1.5)?;
    for modality in [Modality::Ct, Modality::Pt] {
        let viewport = modality.viewport(Plane::Axial);
        info!("  {} parallel scale {:.1}", viewport, renderer.camera(&viewport)?.parallel_scale);
    }
    info!("  fusion parallel scale {:.1}", camera.parallel_scale);

    let ct_sagittal = Modality::Ct.viewport(Plane::Sagittal);
    info!("Window/level on {}", ct_sagittal);
    let voi = renderer.window_level(&ct_sagittal, &ct, -100.0, 20.0)?;
    info!("  window {:.0}/{:.0}", voi.range.window_width(), voi.range.window_center());
    for plane in Plane::ALL {
        let fusion = Modality::Fusion.viewport(plane);
        let range = renderer.display_properties(&fusion, &ct)?.range;
        info!("  {} CT layer {:.0}..{:.0}", fusion, range.lower, range.upper);
    }

    info!("Windowing the PET layer of {}", fusion_axial);
    renderer.set_voi_range(&fusion_axial, &pt, VoiRange::new(0.0, 8.0))?;
    let pt_axial = Modality::Pt.viewport(Plane::Axial);
    let range = renderer.display_properties(&pt_axial, &pt)?.range;
    info!("  {} keeps {:.0}..{:.0}", pt_axial, range.lower, range.upper);

    info!("Fusion opacity to 0.6");
    set_fusion_opacity(renderer, 0.6)?;

    if let Some(axial) = registry.get("AXIAL_CAMERA_SYNCHRONIZER_ID") {
        info!("Panning {} with axial camera sync disabled", pt_axial);
        axial.set_enabled(false)?;
        renderer.pan(&pt_axial, DVec3::new(12.0, 0.0, 0.0))?;
        axial.set_enabled(true)?;
        axial.sync_from(&fusion_axial)?;
        info!("  realigned {} from {}", pt_axial, fusion_axial);
    }

    Ok(())
}

/// Log propagation counters of every synchronizer
pub fn report(registry: &SynchronizerRegistry) {
    for id in registry.ids() {
        if let Some(sync) = registry.get(&id) {
            let stats = sync.stats();
            info!(
                "{}: {} pass(es), {} applied, {} skipped, {} suppressed, {} failed",
                id, stats.passes, stats.applied, stats.skipped, stats.suppressed, stats.failed
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vsync_core::SyncConfig;

    fn wired() -> (Arc<HeadlessRenderer>, SynchronizerRegistry) {
        let renderer = build_viewports();
        let registry = SynchronizerRegistry::new(renderer.clone());
        SyncConfig::from_json_str(crate::DEFAULT_LAYOUT)
            .unwrap()
            .apply(&registry)
            .unwrap();
        (renderer, registry)
    }

    #[test]
    fn test_default_layout_wires_six_synchronizers() {
        let (_, registry) = wired();
        assert_eq!(registry.len(), 6);

        let ct_voi = registry.get("CT_VOI_SYNCHRONIZER_ID").unwrap();
        assert_eq!(ct_voi.sources().len(), 3);
        assert_eq!(ct_voi.targets().len(), 3);
        assert!(ct_voi.has_target(&Modality::Fusion.viewport(Plane::Coronal)));
    }

    #[test]
    fn test_session_runs_on_the_global_registry() {
        let renderer = build_viewports();
        let registry = vsync_core::install_global(renderer.clone()).unwrap();
        SyncConfig::from_json_str(crate::DEFAULT_LAYOUT)
            .unwrap()
            .apply(registry)
            .unwrap();

        initialize_camera_sync(&renderer).unwrap();
        run_session(&renderer, registry).unwrap();
        assert!(vsync_core::global().is_some_and(|global| global.len() == 6));

        registry.dispose_all();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_initial_sync_aligns_rows() {
        let (renderer, _registry) = wired();
        initialize_camera_sync(&renderer).unwrap();

        for plane in Plane::ALL {
            let fusion = renderer.camera(&Modality::Fusion.viewport(plane)).unwrap();
            assert_eq!(renderer.camera(&Modality::Ct.viewport(plane)).unwrap(), fusion);
            assert_eq!(renderer.camera(&Modality::Pt.viewport(plane)).unwrap(), fusion);
        }
    }

    #[test]
    fn test_session_keeps_grid_consistent() {
        let (renderer, registry) = wired();
        initialize_camera_sync(&renderer).unwrap();
        run_session(&renderer, &registry).unwrap();

        let fusion_axial = renderer.camera(&Modality::Fusion.viewport(Plane::Axial)).unwrap();
        assert_eq!(renderer.camera(&Modality::Pt.viewport(Plane::Axial)).unwrap(), fusion_axial);

        let ct = VolumeId::from(CT_VOLUME_ID);
        let ct_sagittal = renderer.display_properties(&Modality::Ct.viewport(Plane::Sagittal), &ct).unwrap();
        let fusion_coronal = renderer
            .display_properties(&Modality::Fusion.viewport(Plane::Coronal), &ct)
            .unwrap();
        assert_eq!(fusion_coronal.range, ct_sagittal.range);

        let pt = VolumeId::from(PT_VOLUME_ID);
        let fusion_pt = renderer
            .display_properties(&Modality::Fusion.viewport(Plane::Sagittal), &pt)
            .unwrap();
        assert_eq!(fusion_pt.range, VoiRange::new(0.0, 8.0));
        assert_eq!(fusion_pt.colormap, Some(Colormap::new("hsv", 0.6)));

        let pt_axial = renderer.display_properties(&Modality::Pt.viewport(Plane::Axial), &pt).unwrap();
        assert_eq!(pt_axial.range, VoiRange::new(0.0, 5.0));
    }
}
