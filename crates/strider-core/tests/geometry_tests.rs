#[cfg(test)]
mod tests {
    use strider::{
        dim4, Array, ArrayError, DType, Device, Dim4, Interpolation, KernelKind, Seq, Source,
    };
    use rand::{rngs::StdRng, Rng, SeedableRng};
    use test_strategy::proptest;

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn ramp(dims: Dim4) -> Array {
        let data: Vec<f32> = (0..dims.elements()).map(|i| (i % 97) as f32).collect();
        Array::from_host(dims, &data, Source::Host, &Device::CPU).unwrap()
    }

    fn matrix(values: &[f32]) -> Array {
        Array::from_host(dim4!(values.len()), values, Source::Host, &Device::CPU).unwrap()
    }

    #[test]
    fn test_same_size_nearest_is_identity() -> anyhow::Result<()> {
        init_logger();
        let x = ramp(dim4!(7, 5, 3));
        let y = x.resize(7, 5, Interpolation::Nearest)?;
        assert_eq!(y.dims()?, dim4!(7, 5, 3));
        assert_eq!(y.host::<f32>()?, x.host::<f32>()?);

        let pixels: Vec<u8> = (0..60u8).collect();
        let img = Array::from_host(dim4!(4, 5, 3), &pixels, Source::Host, &Device::CPU)?;
        let same = img.resize(4, 5, Interpolation::Bilinear)?;
        assert_eq!(same.host::<u8>()?, pixels);
        Ok(())
    }

    #[test]
    fn test_channels_pass_through() -> anyhow::Result<()> {
        let x = ramp(dim4!(4, 4, 3, 2));
        let y = x.resize(2, 8, Interpolation::Bilinear)?;
        assert_eq!(y.dims()?, dim4!(2, 8, 3, 2));
        Ok(())
    }

    #[test]
    fn test_empty_operands() {
        let x = ramp(dim4!(4, 4));
        assert!(matches!(
            x.resize(0, 4, Interpolation::Nearest),
            Err(ArrayError::EmptyOperand(_))
        ));
        let empty = x.index(&[Seq::new(3, 0, 1)]).unwrap();
        assert!(matches!(
            empty.resize(2, 2, Interpolation::Nearest),
            Err(ArrayError::EmptyOperand(_))
        ));
        let m = matrix(&[1.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
        assert!(matches!(
            x.transform(&m, 4, 0, Interpolation::Nearest, true),
            Err(ArrayError::EmptyOperand(_))
        ));
    }

    #[test]
    fn test_unsupported_methods() {
        let x = ramp(dim4!(4, 4));
        for method in [Interpolation::Linear, Interpolation::Cubic] {
            assert!(matches!(
                x.resize(2, 2, method),
                Err(ArrayError::InvalidArgument(_))
            ));
        }
    }

    #[test]
    fn test_f16_has_no_kernel() -> anyhow::Result<()> {
        let x = ramp(dim4!(4, 4)).cast(DType::F16)?;
        assert!(matches!(
            x.resize(2, 2, Interpolation::Nearest),
            Err(ArrayError::InvalidType(_))
        ));
        Ok(())
    }

    #[test]
    fn test_dtype_checked_before_shapes() -> anyhow::Result<()> {
        let half = ramp(dim4!(4, 4)).cast(DType::F16)?;
        assert!(matches!(
            half.resize(0, 2, Interpolation::Nearest),
            Err(ArrayError::InvalidType(_))
        ));
        let m = matrix(&[1.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
        assert!(matches!(
            half.transform(&m, 4, 0, Interpolation::Bilinear, true),
            Err(ArrayError::InvalidType(_))
        ));

        let complex = ramp(dim4!(4, 4)).cast(DType::C32)?;
        for method in [Interpolation::Nearest, Interpolation::Bilinear] {
            assert!(matches!(
                complex.resize(2, 2, method),
                Err(ArrayError::InvalidType(_))
            ));
            assert!(matches!(
                complex.transform(&m, 4, 4, method, true),
                Err(ArrayError::InvalidType(_))
            ));
        }
        Ok(())
    }

    #[test]
    fn test_strided_input_matches_copy() -> anyhow::Result<()> {
        let x = ramp(dim4!(9, 7, 2));
        let view = x.index(&[Seq::new(7, 1, -2), Seq::new(1, 6, 1)])?;
        assert!(!view.is_linear()?);
        for method in [Interpolation::Nearest, Interpolation::Bilinear] {
            let direct = view.resize(6, 3, method)?;
            let packed = view.copy()?.resize(6, 3, method)?;
            assert_eq!(direct.host::<f32>()?, packed.host::<f32>()?);
        }
        Ok(())
    }

    #[test]
    fn test_random_u8_strided_transform() -> anyhow::Result<()> {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let pixels: Vec<u8> = (0..12 * 10 * 3).map(|_| rng.gen()).collect();
        let img = Array::from_host(dim4!(12, 10, 3), &pixels, Source::Host, &Device::CPU)?;
        let view = img.index(&[Seq::new(-1, 0, -1), Seq::new(0, 9, 3)])?;
        let m = matrix(&[
            rng.gen_range(0.8f32..1.2),
            rng.gen_range(-0.2f32..0.2),
            rng.gen_range(-2.0f32..2.0),
            rng.gen_range(-0.2f32..0.2),
            rng.gen_range(0.8f32..1.2),
            rng.gen_range(-2.0f32..2.0),
        ]);
        for method in [Interpolation::Nearest, Interpolation::Bilinear] {
            let direct = view.transform(&m, 8, 6, method, false)?;
            let packed = view.copy()?.transform(&m, 8, 6, method, false)?;
            assert_eq!(direct.dt()?, DType::U8);
            assert_eq!(direct.host::<u8>()?, packed.host::<u8>()?);
        }
        Ok(())
    }

    #[test]
    fn test_downscale_bilinear() -> anyhow::Result<()> {
        let x = Array::from_host(
            dim4!(4, 1),
            &[0.0f64, 2.0, 4.0, 6.0],
            Source::Host,
            &Device::CPU,
        )?;
        // src = x * 2
        let y = x.resize(2, 1, Interpolation::Bilinear)?;
        assert_eq!(y.host::<f64>()?, vec![0.0, 4.0]);
        Ok(())
    }

    #[test]
    fn test_transform_identity() -> anyhow::Result<()> {
        let x = ramp(dim4!(5, 4, 2));
        let affine = matrix(&[1.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
        let perspective = matrix(&[1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0]);
        for m in [&affine, &perspective] {
            for inverse in [false, true] {
                for method in [Interpolation::Nearest, Interpolation::Bilinear] {
                    let y = x.transform(m, 5, 4, method, inverse)?;
                    assert_eq!(y.host::<f32>()?, x.host::<f32>()?);
                }
            }
        }
        Ok(())
    }

    #[test]
    fn test_transform_translation() -> anyhow::Result<()> {
        let x = Array::from_host(
            dim4!(4, 1),
            &[10i32, 20, 30, 40],
            Source::Host,
            &Device::CPU,
        )?;
        // Forward: source x lands on x + 1.
        let shift = matrix(&[1.0, 0.0, 1.0, 0.0, 1.0, 0.0]);
        let forward = x.transform(&shift, 4, 1, Interpolation::Nearest, false)?;
        assert_eq!(forward.host::<i32>()?, vec![0, 10, 20, 30]);

        // Inverse: output x samples source x + 1.
        let inverse = x.transform(&shift, 4, 1, Interpolation::Nearest, true)?;
        assert_eq!(inverse.host::<i32>()?, vec![20, 30, 40, 0]);
        Ok(())
    }

    #[test]
    fn test_transform_scale_bilinear() -> anyhow::Result<()> {
        let x = Array::from_host(dim4!(3, 1), &[0.0f32, 10.0, 20.0], Source::Host, &Device::CPU)?;
        let stretch = matrix(&[2.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
        let y = x.transform(&stretch, 5, 1, Interpolation::Bilinear, false)?;
        assert_eq!(y.host::<f32>()?, vec![0.0, 5.0, 10.0, 15.0, 20.0]);
        Ok(())
    }

    #[test]
    fn test_transform_matrix_validation() {
        let x = ramp(dim4!(4, 4));
        let singular = matrix(&[1.0, 2.0, 0.0, 2.0, 4.0, 0.0]);
        assert!(matches!(
            x.transform(&singular, 4, 4, Interpolation::Nearest, false),
            Err(ArrayError::InvalidArgument(_))
        ));
        // A singular matrix is fine when it already maps output to input.
        assert!(x
            .transform(&singular, 4, 4, Interpolation::Nearest, true)
            .is_ok());

        let short = matrix(&[1.0, 0.0, 0.0, 1.0]);
        assert!(matches!(
            x.transform(&short, 4, 4, Interpolation::Nearest, true),
            Err(ArrayError::InvalidArgument(_))
        ));

        let ints =
            Array::from_host(dim4!(6), &[1i32, 0, 0, 0, 1, 0], Source::Host, &Device::CPU)
                .unwrap();
        assert!(matches!(
            x.transform(&ints, 4, 4, Interpolation::Nearest, true),
            Err(ArrayError::InvalidType(_))
        ));
    }

    #[test]
    fn test_kernel_tables_enumerable() {
        let device = Device::CPU;
        let backend = device.backend();
        for kind in [KernelKind::Resize, KernelKind::Transform] {
            let supported = backend.kernels(kind);
            assert_eq!(supported.len(), 12);
            assert!(supported.contains(&(DType::U8, Interpolation::Bilinear)));
            assert!(!supported
                .iter()
                .any(|(dt, _)| *dt == DType::F16 || dt.is_complex()));
        }
    }

    #[proptest(cases = 32)]
    fn test_bilinear_stays_in_range(
        #[strategy(1usize..12)] in0: usize,
        #[strategy(1usize..12)] in1: usize,
        #[strategy(1usize..24)] out0: usize,
        #[strategy(1usize..24)] out1: usize,
    ) {
        let x = ramp(dim4!(in0, in1));
        let input = x.host::<f32>().unwrap();
        let lo = input.iter().cloned().fold(f32::INFINITY, f32::min);
        let hi = input.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        let y = x.resize(out0, out1, Interpolation::Bilinear).unwrap();
        for v in y.host::<f32>().unwrap() {
            assert!(v >= lo - 1e-3 && v <= hi + 1e-3, "{} outside [{}, {}]", v, lo, hi);
        }
    }
}
