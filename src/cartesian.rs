/// Lazy product of several ordered domains.
///
/// Tuples come out in lexicographic order: the last domain varies fastest and
/// the first domain changes only after every later domain has wrapped around.
/// The iterator keeps one index per domain, so deep parameter lists cost no
/// stack. With no domains at all it yields a single empty tuple; if any domain
/// is empty it yields nothing.
#[derive(Clone, Debug)]
pub struct CartesianProduct<'a, T> {
    domains: Vec<&'a [T]>,
    indices: Vec<usize>,
    done: bool
}

impl<'a, T> CartesianProduct<'a, T> {
    pub fn new(domains: Vec<&'a [T]>) -> Self {
        let done = domains.iter().any(|d| d.is_empty());
        CartesianProduct { indices: vec![0; domains.len()], domains, done }
    }

    pub fn reset(&mut self) {
        self.indices.iter_mut().for_each(|i| *i = 0);
        self.done = self.domains.iter().any(|d| d.is_empty());
    }

    pub fn combinations(&self) -> usize {
        self.domains.iter().fold(1usize, |n, d| n.saturating_mul(d.len()))
    }

    fn advance(&mut self) {
        for pos in (0..self.domains.len()).rev() {
            self.indices[pos] += 1;
            if self.indices[pos] < self.domains[pos].len() {
                return;
            }
            self.indices[pos] = 0;
        }
        self.done = true;
    }
}

impl<'a, T> Iterator for CartesianProduct<'a, T> {
    type Item = Vec<&'a T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let tuple = self.indices.iter().zip(self.domains.iter())
            .map(|(i, d)| &d[*i])
            .collect();
        self.advance();
        Some(tuple)
    }
}

pub fn cartesian_product<'a, T>(domains: Vec<&'a [T]>) -> CartesianProduct<'a, T> {
    CartesianProduct::new(domains)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use super::*;

    #[test]
    fn rightmost_varies_fastest() {
        let a = ["a1", "a2"];
        let b = ["b1", "b2", "b3"];
        let tuples = cartesian_product(vec![&a[..], &b[..]])
            .map(|t| t.into_iter().map(|s| *s).collect::<Vec<_>>().join(" "))
            .collect::<Vec<_>>();
        assert_eq!(tuples, vec!["a1 b1", "a1 b2", "a1 b3", "a2 b1", "a2 b2", "a2 b3"]);
    }

    #[test]
    fn no_domains_gives_one_empty_tuple() {
        let product = cartesian_product::<u8>(vec![]);
        assert_eq!(product.combinations(), 1);
        assert_eq!(product.collect::<Vec<_>>(), vec![Vec::<&u8>::new()]);
    }

    #[test]
    fn empty_domain_gives_nothing() {
        let full = [1, 2];
        let empty: [i32; 0] = [];
        assert_eq!(cartesian_product(vec![&full[..], &empty[..]]).count(), 0);
    }

    #[test]
    fn restartable() {
        let a = [1, 2, 3];
        let mut product = cartesian_product(vec![&a[..], &a[..]]);
        assert_eq!(product.combinations(), 9);
        assert_eq!(product.by_ref().take(4).count(), 4);
        product.reset();
        assert_eq!(product.count(), 9);
    }

    #[test]
    fn deep_parameter_lists() {
        let pair = [0u8, 1];
        let domains = vec![&pair[..]; 16];
        assert_eq!(cartesian_product(domains).count(), 1 << 16);
    }
}
