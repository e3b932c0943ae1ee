use std::path::PathBuf;

use argh::FromArgs;
use rayon::prelude::*;

use align2nerf::intrinsics::DistortionPolicy;
use align2nerf::normalize::NormalizeOptions;
use align2nerf::record::{self, CameraRecord};
use align2nerf::resolution::{FixedResolutions, ImageFolder, ResolutionLookup};
use align2nerf::{convert_scene, ConvertConfig};

#[cfg(feature = "viz")]
mod viz;

#[derive(FromArgs)]
/// Convert a photogrammetry camera-alignment export (csv or xml) to NeRF transforms.json
struct Args {
    /// path to the alignment-export file
    #[argh(positional)]
    input: PathBuf,

    /// output path
    #[argh(option, default = "PathBuf::from(\"transforms.json\")")]
    out: PathBuf,

    /// location of the folder with images
    #[argh(option, default = "PathBuf::from(\"./images\")")]
    imgfolder: PathBuf,

    /// type of images (ex. jpg, png, ...)
    #[argh(option, default = "String::from(\"jpg\")")]
    imgtype: String,

    /// size of the aabb, default is 16
    #[argh(option, default = "16")]
    aabb_scale: u32,

    /// scale the scene by an extra factor
    #[argh(option, default = "1.0")]
    scale: f64,

    /// disable fitting the cameras into the unit bounding sphere
    #[argh(switch)]
    no_scale: bool,

    /// disable centering the cameras around the computed centroid
    #[argh(switch)]
    no_center: bool,

    /// disable aligning the rig up-axis with the world up-axis
    #[argh(switch)]
    no_reorient: bool,

    /// drop cameras with an unsupported distortion model instead of aborting
    #[argh(switch)]
    drop_unsupported: bool,

    /// ignore missing image files, for debugging purposes only
    #[argh(switch)]
    debug_ignore_images: bool,

    /// number of threads for the image-resolution prefetch
    #[argh(option, default = "8")]
    threads: usize,

    #[cfg(feature = "viz")]
    /// plot the cameras in 3D with rerun
    #[argh(switch)]
    viz: bool,

    #[cfg(feature = "viz")]
    /// size of the camera glyphs in the 3D plot, does not affect the output
    #[argh(option, default = "0.1")]
    camera_size: f32,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args: Args = argh::from_env();

    let records = record::read_records(&args.input)?;
    log::info!("parsed {} camera records", records.len());

    let folder = ImageFolder::new(&args.imgfolder, &args.imgtype)?;
    if folder.is_empty() && !args.debug_ignore_images {
        return Err(format!(
            "no .{} images found in folder: {}",
            args.imgtype,
            args.imgfolder.display()
        )
        .into());
    }

    let lookup = prefetch_resolutions(&folder, &records, args.threads)?;

    let config = ConvertConfig {
        aabb_scale: args.aabb_scale,
        normalize: NormalizeOptions {
            auto_scale: !args.no_scale,
            auto_center: !args.no_center,
            auto_orient: !args.no_reorient,
            scene_scale: args.scale,
        },
        distortion_policy: if args.drop_unsupported {
            DistortionPolicy::DropCamera
        } else {
            DistortionPolicy::Abort
        },
        ignore_missing_images: args.debug_ignore_images,
        ..Default::default()
    };

    let doc = convert_scene(&records, &lookup, &config)?;

    #[cfg(feature = "viz")]
    if args.viz {
        viz::log_scene(&doc, args.camera_size)?;
    }

    doc.write_json(&args.out)?;
    log::info!("wrote {} frames to {}", doc.frames.len(), args.out.display());
    Ok(())
}

/// Resolve every record's image dimensions on a worker pool.
///
/// Each lookup is independent; the results are merged by identifier before
/// the assembler runs. Identifiers that resolve to nothing stay absent and
/// surface later as missing images.
fn prefetch_resolutions(
    folder: &ImageFolder,
    records: &[CameraRecord],
    threads: usize,
) -> Result<FixedResolutions, rayon::ThreadPoolBuildError> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()?;

    let resolved = pool.install(|| {
        records
            .par_iter()
            .map(|record| {
                let entry = folder
                    .file_name(&record.id)
                    .zip(folder.dimensions(&record.id));
                (record.id.clone(), entry)
            })
            .collect::<Vec<_>>()
    });

    let mut lookup = FixedResolutions::new();
    for (id, entry) in resolved {
        match entry {
            Some((file_name, dims)) => lookup.insert(id, file_name, dims),
            None => log::debug!("no image resolved for `{id}`"),
        }
    }
    Ok(lookup)
}
