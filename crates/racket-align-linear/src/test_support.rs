use crate::Mat34;
use nalgebra::{Rotation3, Vector3};
use racket_align_core::{Mat3, Pt3, Real};

/// Deterministic, non-coplanar ball positions in the robot workspace.
pub fn ball_cloud(n: usize) -> Vec<Pt3> {
    let frac = |v: Real| v - v.floor();
    (0..n)
        .map(|i| {
            let k = i as Real + 1.0;
            Pt3::new(
                -0.5 + frac(k * 0.618_034),
                0.3 + 0.7 * frac(k * 0.414_214),
                0.8 + 0.7 * frac(k * 0.732_051),
            )
        })
        .collect()
}

/// One of two cameras looking at the workspace from behind the table.
pub fn stereo_camera(index: usize) -> Mat34 {
    let eye = if index == 0 {
        Pt3::new(-1.0, 3.0, 2.0)
    } else {
        Pt3::new(1.0, 3.0, 2.0)
    };
    let target = Pt3::new(0.0, 0.65, 1.15);
    let r_wc = Rotation3::face_towards(&(target - eye), &Vector3::z());
    let r_cw = r_wc.inverse();
    let t = -(r_cw * eye.coords);
    let k = Mat3::new(900.0, 0.0, 640.0, 0.0, 900.0, 360.0, 0.0, 0.0, 1.0);

    let mut p = Mat34::zeros();
    p.fixed_view_mut::<3, 3>(0, 0).copy_from(&(k * r_cw.matrix()));
    p.set_column(3, &(k * t));
    p
}
