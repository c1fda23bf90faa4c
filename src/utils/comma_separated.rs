#[repr(transparent)]
pub struct CommaSeparated<'s, T: 's>(pub &'s [T]);
impl<'s, T: 's> core::fmt::Display for CommaSeparated<'s, T>
where
    T: core::fmt::Display,
{
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut wrote = false;
        for x in self.0 {
            if wrote {
                f.write_str(", ")?;
            }
            <T as core::fmt::Display>::fmt(x, f)?;
            wrote = true;
        }

        Ok(())
    }
}
