use align2nerf::SceneDocument;

/// Log the converted camera frustums to a Rerun viewer.
///
/// Purely a debugging aid; nothing here feeds back into the output document.
pub fn log_scene(doc: &SceneDocument, camera_size: f32) -> Result<(), Box<dyn std::error::Error>> {
    let rec = rerun::RecordingStreamBuilder::new("align2nerf").spawn()?;

    rec.log("/", &rerun::ViewCoordinates::RIGHT_HAND_Y_UP())?;

    for (i, frame) in doc.frames.iter().enumerate() {
        let m = &frame.transform_matrix;
        let translation = [m[0][3] as f32, m[1][3] as f32, m[2][3] as f32];
        // rerun wants the 3x3 column-major
        let mat3x3 = [
            m[0][0] as f32,
            m[1][0] as f32,
            m[2][0] as f32,
            m[0][1] as f32,
            m[1][1] as f32,
            m[2][1] as f32,
            m[0][2] as f32,
            m[1][2] as f32,
            m[2][2] as f32,
        ];

        rec.log(
            format!("camera_{i}"),
            &rerun::Transform3D::from_translation_mat3x3(translation, mat3x3),
        )?;

        rec.log(
            format!("camera_{i}/image"),
            &rerun::Pinhole::from_focal_length_and_resolution(
                [frame.fl_x as f32, frame.fl_y as f32],
                [frame.w as f32, frame.h as f32],
            )
            .with_principal_point([frame.cx as f32, frame.cy as f32])
            .with_image_plane_distance(camera_size),
        )?;
    }

    Ok(())
}
