//! Small nom helpers shared by the record parsers
use nom::bytes::complete::take;
use nom::combinator::map_res;
use nom::IResult;

/// Parse `N` raw bytes into a fixed-size array
pub fn fixed_bytes<const N: usize>(i: &[u8]) -> IResult<&[u8], [u8; N]> {
    map_res(take(N), |bytes: &[u8]| <[u8; N]>::try_from(bytes))(i)
}

/// Describe a nom failure by error kind and the byte offset it happened at,
/// relative to the start of `input`.
pub fn describe_error(input: &[u8], err: nom::Err<nom::error::Error<&[u8]>>) -> String {
    match err {
        nom::Err::Incomplete(needed) => format!("incomplete input: {:?}", needed),
        nom::Err::Error(e) | nom::Err::Failure(e) => format!(
            "{:?} at byte {}",
            e.code,
            input.len().saturating_sub(e.input.len())
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::{describe_error, fixed_bytes};

    #[test]
    fn fixed_bytes_takes_exactly_n() {
        let data = [1_u8, 2, 3, 4, 5];

        let (rest, taken) = fixed_bytes::<3>(&data).unwrap();

        assert_eq!(taken, [1, 2, 3]);
        assert_eq!(rest, &[4, 5]);
    }

    #[test]
    fn short_input_reports_offset() {
        let data = [1_u8, 2];

        let err = fixed_bytes::<4>(&data[1..]).unwrap_err();

        assert_eq!(describe_error(&data[1..], err), "Eof at byte 0");
    }
}
